//! Per-frame GPU render targets and SSAO sampling data.

use glam::Vec2;

use super::ssao_kernel::{SsaoKernel, generate_noise};
use super::targets::{FrameTarget, FrameTargetDesc, TargetId};
use crate::config::RendererConfig;
use crate::constants::ssao::NOISE_FORMAT;
use crate::context::RenderContext;
use crate::renderer::gpu_resources::{create_uniform_buffer, texture_bytes};

/// Returns true when a viewport change requires reallocating targets.
///
/// Zero-sized viewports (minimized windows) and unchanged sizes are ignored.
pub fn needs_resize(current: (u32, u32), requested: (u32, u32)) -> bool {
    requested.0 > 0 && requested.1 > 0 && current != requested
}

/// Owns every render target a frame writes to, plus the SSAO noise texture
/// and sample kernel.
///
/// Targets are allocated on construction and only reallocated through
/// [`FrameResourceSet::resize`], which the render system calls between frames.
pub struct FrameResourceSet {
    layout: Vec<FrameTargetDesc>,
    targets: Vec<FrameTarget>,
    viewport: (u32, u32),
    generation: u64,
    kernel: SsaoKernel,
    kernel_buffer: wgpu::Buffer,
    noise_texture: wgpu::Texture,
    noise_view: wgpu::TextureView,
    noise_size: u32,
}

impl FrameResourceSet {
    pub fn new(ctx: &RenderContext, config: &RendererConfig) -> Self {
        let device = ctx.device();
        let viewport = (ctx.width().max(1), ctx.height().max(1));

        let layout = FrameTargetDesc::standard_layout(config.shadow_resolution);
        let targets = allocate_all(device, &layout, viewport);

        let kernel = SsaoKernel::generate(config.ssao.kernel_samples as usize, config.ssao.seed);
        let kernel_buffer = create_uniform_buffer(device, "SSAO Kernel Buffer", &kernel.to_uniform());

        let noise_size = config.ssao.noise_size.max(1);
        let noise_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("SSAO Noise"),
            size: wgpu::Extent3d {
                width: noise_size,
                height: noise_size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: NOISE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let noise = generate_noise(noise_size, config.ssao.seed);
        ctx.queue().write_texture(
            wgpu::ImageCopyTexture {
                texture: &noise_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&noise),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(16 * noise_size),
                rows_per_image: Some(noise_size),
            },
            noise_texture.size(),
        );
        let noise_view = noise_texture.create_view(&wgpu::TextureViewDescriptor::default());

        tracing::info!(
            width = viewport.0,
            height = viewport.1,
            kernel_samples = kernel.len(),
            noise_size,
            "Frame resources allocated"
        );

        Self {
            layout,
            targets,
            viewport,
            generation: 0,
            kernel,
            kernel_buffer,
            noise_texture,
            noise_view,
            noise_size,
        }
    }

    /// Reallocates every viewport-sized target for a new viewport.
    ///
    /// Fixed-size targets and the noise texture are kept. A target that
    /// fails to allocate keeps its previous textures and is marked
    /// incomplete, which disables the stages that depend on it until a
    /// later resize succeeds. Returns false when nothing was reallocated.
    pub fn resize(&mut self, ctx: &RenderContext, width: u32, height: u32) -> bool {
        if !needs_resize(self.viewport, (width, height)) {
            return false;
        }

        let viewport = (width, height);
        for desc in self.layout.iter().filter(|d| d.follows_viewport()) {
            let slot = &mut self.targets[desc.id.index()];
            match FrameTarget::allocate(ctx.device(), desc, viewport) {
                Ok(target) => *slot = target,
                Err(err) => {
                    tracing::warn!(%err, "Frame target reallocation failed; dependent passes disabled");
                    slot.invalidate();
                }
            }
        }

        tracing::info!(
            from_width = self.viewport.0,
            from_height = self.viewport.1,
            width,
            height,
            "Frame resources resized"
        );
        self.viewport = viewport;
        self.generation += 1;
        true
    }

    pub fn target(&self, id: TargetId) -> &FrameTarget {
        &self.targets[id.index()]
    }

    /// Returns true if the target passed its last completeness check.
    pub fn is_complete(&self, id: TargetId) -> bool {
        self.target(id).is_complete()
    }

    pub fn all_complete(&self, ids: &[TargetId]) -> bool {
        ids.iter().all(|&id| self.is_complete(id))
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Incremented on every reallocation; bind groups built from an older
    /// generation reference released textures.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn kernel(&self) -> &SsaoKernel {
        &self.kernel
    }

    pub fn kernel_buffer(&self) -> &wgpu::Buffer {
        &self.kernel_buffer
    }

    pub fn noise_view(&self) -> &wgpu::TextureView {
        &self.noise_view
    }

    pub fn noise_size(&self) -> u32 {
        self.noise_size
    }

    /// Screen-to-noise texel scale.
    pub fn noise_scale(&self) -> Vec2 {
        Vec2::new(self.viewport.0 as f32, self.viewport.1 as f32) / self.noise_size as f32
    }

    pub fn memory_bytes(&self) -> u64 {
        self.targets.iter().map(FrameTarget::memory_bytes).sum::<u64>()
            + self.kernel_buffer.size()
            + texture_bytes(&self.noise_texture)
    }
}

fn allocate_all(device: &wgpu::Device, layout: &[FrameTargetDesc], viewport: (u32, u32)) -> Vec<FrameTarget> {
    let mut targets: Vec<FrameTarget> = layout
        .iter()
        .map(|desc| FrameTarget::allocate_or_placeholder(device, desc, viewport))
        .collect();
    targets.sort_by_key(|t| t.id().index());
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_resize() {
        assert!(needs_resize((800, 600), (1920, 1080)));
        assert!(!needs_resize((800, 600), (800, 600)));
        assert!(!needs_resize((800, 600), (0, 600)));
        assert!(!needs_resize((800, 600), (800, 0)));
    }

    #[test]
    fn test_layout_covers_every_target_once() {
        let layout = FrameTargetDesc::standard_layout(1024);
        for id in TargetId::ALL {
            assert_eq!(layout.iter().filter(|d| d.id == id).count(), 1);
        }
    }
}
