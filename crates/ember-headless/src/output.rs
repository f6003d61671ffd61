//! Offscreen output target and PNG export.

use std::path::Path;

use ember_renderer::renderer::gpu_resources::{create_output_texture, read_texture_rgba8};
use ember_renderer::{RenderContext, RenderError};

/// Format of the frames rendered by the headless runner.
pub const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Color texture the lighting and overlay stages render into.
pub struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl OffscreenTarget {
    pub fn new(ctx: &RenderContext, width: u32, height: u32) -> Self {
        let (texture, view) = create_output_texture(ctx.device(), OUTPUT_FORMAT, width, height);
        Self { texture, view }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> (u32, u32) {
        let size = self.texture.size();
        (size.width, size.height)
    }

    /// Reallocates when the requested size differs.
    pub fn resize(&mut self, ctx: &RenderContext, width: u32, height: u32) {
        if self.size() != (width, height) && width > 0 && height > 0 {
            *self = Self::new(ctx, width, height);
        }
    }

    pub fn read_pixels(&self, ctx: &RenderContext) -> Result<Vec<u8>, RenderError> {
        read_texture_rgba8(ctx.device(), ctx.queue(), &self.texture)
    }

    /// Reads the target back and writes it as PNG.
    pub fn save_png(&self, ctx: &RenderContext, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let (width, height) = self.size();
        let pixels = self.read_pixels(ctx)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        image::save_buffer(path, &pixels, width, height, image::ExtendedColorType::Rgba8)?;
        tracing::info!(
            brightness = format_args!("{:.3}", mean_brightness(&pixels)),
            "Wrote {}x{} frame to {:?}",
            width,
            height,
            path
        );
        Ok(())
    }
}

/// Mean of the RGB channels over all pixels, in `[0, 1]`.
pub fn mean_brightness(pixels: &[u8]) -> f32 {
    let mut sum = 0u64;
    let mut count = 0u64;
    for pixel in pixels.chunks_exact(4) {
        sum += pixel[0] as u64 + pixel[1] as u64 + pixel[2] as u64;
        count += 3;
    }
    if count == 0 {
        return 0.0;
    }
    sum as f32 / (count as f32 * 255.0)
}
