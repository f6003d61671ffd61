//! Material texture management.

use std::collections::HashMap;

use crate::context::RenderContext;
use crate::renderer::gpu_resources::{create_linear_sampler, texture_bytes};

/// Handle to a texture stored in the TextureManager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(u64);

impl TextureHandle {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A sampled texture with its material bind group.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub bind_group: wgpu::BindGroup,
}

/// Owns diffuse textures and their bind groups.
///
/// A 1x1 white texture is always present and is used for meshes without a
/// material or with a handle that is no longer valid.
pub struct TextureManager {
    textures: HashMap<TextureHandle, GpuTexture>,
    fallback: GpuTexture,
    sampler: wgpu::Sampler,
    next_handle: u64,
}

impl TextureManager {
    pub fn new(ctx: &RenderContext, material_layout: &wgpu::BindGroupLayout) -> Self {
        let sampler = create_linear_sampler(ctx.device(), "Material Sampler");
        let fallback = upload_rgba8(ctx, material_layout, &sampler, "White Texture", 1, 1, &[255; 4]);
        Self {
            textures: HashMap::new(),
            fallback,
            sampler,
            next_handle: 1,
        }
    }

    /// Uploads tightly packed RGBA8 pixels.
    ///
    /// Returns `None` when the pixel buffer does not match the dimensions.
    pub fn create_rgba8(
        &mut self,
        ctx: &RenderContext,
        material_layout: &wgpu::BindGroupLayout,
        label: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Option<TextureHandle> {
        if width == 0 || height == 0 || pixels.len() != (width * height * 4) as usize {
            tracing::warn!(label, width, height, len = pixels.len(), "Rejected texture upload");
            return None;
        }

        let texture = upload_rgba8(ctx, material_layout, &self.sampler, label, width, height, pixels);
        let handle = TextureHandle(self.next_handle);
        self.next_handle += 1;
        self.textures.insert(handle, texture);
        Some(handle)
    }

    /// Material bind group for a mesh, falling back to white.
    pub fn bind_group(&self, handle: Option<TextureHandle>) -> &wgpu::BindGroup {
        handle
            .and_then(|h| self.textures.get(&h))
            .map_or(&self.fallback.bind_group, |t| &t.bind_group)
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&GpuTexture> {
        self.textures.get(&handle)
    }

    pub fn remove(&mut self, handle: TextureHandle) -> Option<GpuTexture> {
        self.textures.remove(&handle)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn memory_bytes(&self) -> u64 {
        std::iter::once(&self.fallback)
            .chain(self.textures.values())
            .map(|t| texture_bytes(&t.texture))
            .sum()
    }
}

fn upload_rgba8(
    ctx: &RenderContext,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    label: &str,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> GpuTexture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = ctx.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    ctx.queue().write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = ctx.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });

    GpuTexture {
        texture,
        view,
        bind_group,
    }
}
