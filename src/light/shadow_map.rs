//! Shadow map texture handle.

/// A depth texture a light renders its shadow map into, one array layer per
/// cascade.
///
/// Allocation is host-driven; the shadow subsystem only moves the handle
/// around and releases it on disposal.
pub struct ShadowMap {
    texture: wgpu::Texture,
    /// View over every layer, for sampling as a `texture_depth_2d_array`.
    array_view: wgpu::TextureView,
    /// One render-target view per layer.
    layer_views: Vec<wgpu::TextureView>,
    resolution: u32,
}

impl ShadowMap {
    /// Allocate a depth texture of `layers` square layers at `resolution`.
    pub fn new(device: &wgpu::Device, resolution: u32, layers: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("cascade shadow map"),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: layers.max(1),
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let array_view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });

        let layer_views = (0..layers.max(1))
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        Self {
            texture,
            array_view,
            layer_views,
            resolution,
        }
    }

    /// The whole-array view for binding as a sampled texture.
    #[inline]
    pub fn array_view(&self) -> &wgpu::TextureView {
        &self.array_view
    }

    /// The render-target view for one layer.
    #[inline]
    pub fn layer_view(&self, layer: usize) -> Option<&wgpu::TextureView> {
        self.layer_views.get(layer)
    }

    /// The underlying texture.
    #[inline]
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// Layer resolution (width == height).
    #[inline]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Number of layers.
    #[inline]
    pub fn layers(&self) -> usize {
        self.layer_views.len()
    }

    /// Recreate the texture when the requested shape differs.
    pub fn resize(&mut self, device: &wgpu::Device, resolution: u32, layers: u32) {
        if self.resolution != resolution || self.layer_views.len() != layers.max(1) as usize {
            *self = Self::new(device, resolution, layers);
        }
    }
}
