//! Bind group layouts and buffers shared by several stages.

use std::num::NonZeroU64;

use super::gpu_resources::{align_to, create_buffer_bind_group, create_uniform_buffer};
use super::uniforms::{FrameUniform, ObjectUniform};
use crate::context::RenderContext;

const OBJECT_SIZE: u64 = std::mem::size_of::<ObjectUniform>() as u64;
const INITIAL_OBJECT_CAPACITY: usize = 64;

/// Layouts every stage pipeline is built against.
pub struct BindingLayouts {
    /// Frame parameters at binding 0.
    pub frame: wgpu::BindGroupLayout,
    /// One object transform, selected with a dynamic offset.
    pub object: wgpu::BindGroupLayout,
    /// Diffuse texture and sampler.
    pub material: wgpu::BindGroupLayout,
}

impl BindingLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let frame = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let object = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(OBJECT_SIZE),
                },
                count: None,
            }],
        });

        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        Self {
            frame,
            object,
            material,
        }
    }
}

/// Dynamic-offset stride of one object transform.
pub fn object_stride(uniform_alignment: u32) -> u64 {
    align_to(OBJECT_SIZE, uniform_alignment as u64)
}

/// Frame parameters and per-object transforms for the current frame.
///
/// Object transforms are written once per frame, before any stage runs, in
/// render-list order; stages address entry `i` with [`FrameBindings::object_offset`].
pub struct FrameBindings {
    frame_buffer: wgpu::Buffer,
    frame_group: wgpu::BindGroup,
    object_buffer: wgpu::Buffer,
    object_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
    scratch: Vec<u8>,
}

impl FrameBindings {
    pub fn new(ctx: &RenderContext, layouts: &BindingLayouts) -> Self {
        let device = ctx.device();
        let frame_buffer = create_uniform_buffer(device, "Frame Buffer", &FrameUniform::default());
        let frame_group = create_buffer_bind_group(device, "Frame Bind Group", &layouts.frame, &frame_buffer);

        let stride = object_stride(ctx.uniform_alignment());
        let (object_buffer, object_group) =
            create_object_storage(device, layouts, stride, INITIAL_OBJECT_CAPACITY);

        Self {
            frame_buffer,
            frame_group,
            object_buffer,
            object_group,
            stride,
            capacity: INITIAL_OBJECT_CAPACITY,
            scratch: Vec::new(),
        }
    }

    pub fn write_frame(&self, queue: &wgpu::Queue, uniform: &FrameUniform) {
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(uniform));
    }

    /// Uploads object transforms, growing the buffer when needed.
    pub fn write_objects(&mut self, ctx: &RenderContext, layouts: &BindingLayouts, objects: &[ObjectUniform]) {
        if objects.len() > self.capacity {
            let capacity = objects.len().next_power_of_two();
            let (buffer, group) = create_object_storage(ctx.device(), layouts, self.stride, capacity);
            self.object_buffer = buffer;
            self.object_group = group;
            self.capacity = capacity;
            tracing::debug!(capacity, "Grew object uniform buffer");
        }
        if objects.is_empty() {
            return;
        }

        let stride = self.stride as usize;
        self.scratch.clear();
        self.scratch.resize(stride * objects.len(), 0);
        for (chunk, object) in self.scratch.chunks_exact_mut(stride).zip(objects) {
            chunk[..OBJECT_SIZE as usize].copy_from_slice(bytemuck::bytes_of(object));
        }
        ctx.queue().write_buffer(&self.object_buffer, 0, &self.scratch);
    }

    pub fn frame_group(&self) -> &wgpu::BindGroup {
        &self.frame_group
    }

    pub fn object_group(&self) -> &wgpu::BindGroup {
        &self.object_group
    }

    /// Dynamic offset of the `index`-th object written this frame.
    pub fn object_offset(&self, index: usize) -> u32 {
        (index as u64 * self.stride) as u32
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn memory_bytes(&self) -> u64 {
        self.frame_buffer.size() + self.object_buffer.size()
    }
}

fn create_object_storage(
    device: &wgpu::Device,
    layouts: &BindingLayouts,
    stride: u64,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Object Buffer"),
        size: stride * capacity as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Object Bind Group"),
        layout: &layouts.object,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(OBJECT_SIZE),
            }),
        }],
    });
    (buffer, group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_stride_respects_alignment() {
        assert_eq!(object_stride(256), 256);
        assert_eq!(object_stride(64), 128);
    }
}
