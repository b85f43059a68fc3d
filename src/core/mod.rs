//! Core engine plumbing shared across modules.

mod id;

pub use id::Id;
