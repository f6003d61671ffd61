//! The six pipeline stages.
//!
//! Each stage owns its pipeline and any stage-specific bind groups; bind
//! groups that reference frame targets are rebuilt in `on_resize`.

mod debug_overlay;
mod geometry;
mod lighting;
mod shadow;
mod ssao;
mod ssao_blur;

pub use debug_overlay::*;
pub use geometry::*;
pub use lighting::*;
pub use shadow::*;
pub use ssao::*;
pub use ssao_blur::*;

use crate::traits::FrameContext;

/// Bind group slot that receives the per-object transform.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ObjectSlot(pub u32);

/// Draws every mesh of every object in the render list.
///
/// `material_slot` binds each mesh's diffuse texture; depth-only stages pass
/// `None`.
pub(crate) fn draw_render_list(
    pass: &mut wgpu::RenderPass<'_>,
    frame: &FrameContext<'_>,
    object_slot: ObjectSlot,
    material_slot: Option<u32>,
) -> u32 {
    let mut draws = 0;
    for (index, object) in frame.render_list.iter().enumerate() {
        pass.set_bind_group(
            object_slot.0,
            frame.bindings.object_group(),
            &[frame.bindings.object_offset(index)],
        );
        for &handle in &object.meshes {
            let Some(mesh) = frame.meshes.get(handle) else {
                continue;
            };
            if let Some(slot) = material_slot {
                pass.set_bind_group(slot, frame.textures.bind_group(mesh.material), &[]);
            }
            mesh.draw(pass);
            draws += 1;
        }
    }
    draws
}

/// Layout entry for a texture read with `textureLoad`.
pub(crate) fn load_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
        },
        count: None,
    }
}

pub(crate) fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Color attachment cleared to `clear` and stored.
pub(crate) fn cleared_attachment(
    view: &wgpu::TextureView,
    clear: wgpu::Color,
) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(clear),
            store: wgpu::StoreOp::Store,
        },
    })
}

/// Clear value for occlusion targets: fully unoccluded.
pub(crate) const NO_OCCLUSION: wgpu::Color = wgpu::Color {
    r: 1.0,
    g: 1.0,
    b: 1.0,
    a: 1.0,
};
