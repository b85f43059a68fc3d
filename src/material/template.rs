//! Shading program templates.

/// Stable structural identity of a shading template, derived from its
/// source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateKey([u8; 32]);

impl TemplateKey {
    /// Hash a source string into a key.
    pub fn from_source(source: &str) -> Self {
        Self(*blake3::hash(source.as_bytes()).as_bytes())
    }
}

/// A base shading program shared by any number of materials.
///
/// Templates are immutable once created; per-material variation happens
/// through defines and compile interceptors, never by editing the template.
pub struct ShaderTemplate {
    /// Human-readable name.
    name: String,
    /// WGSL source (vertex + fragment stages in one module).
    source: String,
    /// Content-derived identity key.
    key: TemplateKey,
}

impl ShaderTemplate {
    /// Create a template from WGSL source.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let key = TemplateKey::from_source(&source);
        Self {
            name: name.into(),
            source,
            key,
        }
    }

    /// The built-in forward-lit template with one directional light.
    pub fn lit() -> Self {
        Self::new("lit", include_str!("../shaders/lit.wgsl"))
    }

    /// Template name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// WGSL source text.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Structural identity key.
    #[inline]
    pub fn key(&self) -> TemplateKey {
        self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_tracks_content() {
        let a = ShaderTemplate::new("a", "fn main() {}");
        let b = ShaderTemplate::new("b", "fn main() {}");
        let c = ShaderTemplate::new("c", "fn other() {}");
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }
}
