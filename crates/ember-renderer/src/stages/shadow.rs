//! Shadow depth stage.

use super::{ObjectSlot, draw_render_list};
use crate::constants::{point_shadow, shadow};
use crate::context::RenderContext;
use crate::frame::{FrameResourceSet, TargetId};
use crate::pipeline::PipelineConfig;
use crate::renderer::gpu_resources::{create_buffer_bind_group, create_uniform_buffer};
use crate::renderer::{BindingLayouts, PointShadowFaceUniform, ShadowUniform};
use crate::shader::ShaderProgram;
use crate::traits::{FrameContext, RenderStage, StageKind};
use crate::vertex::MeshVertex;

/// Renders the render list's depth from the primary directional light, then
/// from the shadow-casting point light into six cube faces.
///
/// No material is bound. The directional pass culls front faces and applies
/// a slope-scaled depth bias to reduce acne. The point pass stores distance
/// to the light over the far plane, one layer per face.
pub struct ShadowStage {
    enabled: bool,
    pipeline: wgpu::RenderPipeline,
    shadow_buffer: wgpu::Buffer,
    shadow_group: wgpu::BindGroup,
    point_pipeline: wgpu::RenderPipeline,
    face_buffers: Vec<wgpu::Buffer>,
    face_groups: Vec<wgpu::BindGroup>,
}

fn uniform_layout(device: &wgpu::Device, label: &str, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

impl ShadowStage {
    pub fn new(
        ctx: &RenderContext,
        program: &ShaderProgram,
        point_program: &ShaderProgram,
        layouts: &BindingLayouts,
    ) -> Self {
        let device = ctx.device();
        let shadow_layout = uniform_layout(device, "Shadow Bind Group Layout", wgpu::ShaderStages::VERTEX);
        let shadow_buffer = create_uniform_buffer(device, "Shadow Uniform Buffer", &ShadowUniform::default());
        let shadow_group = create_buffer_bind_group(device, "Shadow Bind Group", &shadow_layout, &shadow_buffer);

        let bind_group_layouts = [&shadow_layout, &layouts.object];
        let pipeline = PipelineConfig::new("Shadow", program, &bind_group_layouts)
            .with_vertex_layouts(vec![MeshVertex::layout()])
            .with_depth(shadow::SHADOW_MAP_FORMAT, true, wgpu::CompareFunction::LessEqual)
            .with_depth_bias(shadow::DEPTH_BIAS_CONSTANT, shadow::DEPTH_BIAS_SLOPE)
            .with_cull_mode(Some(wgpu::Face::Front))
            .build(device);

        let face_layout = uniform_layout(
            device,
            "Point Shadow Face Bind Group Layout",
            wgpu::ShaderStages::VERTEX_FRAGMENT,
        );
        let face_buffers: Vec<wgpu::Buffer> = (0..point_shadow::FACES)
            .map(|_| create_uniform_buffer(device, "Point Shadow Face Buffer", &PointShadowFaceUniform::default()))
            .collect();
        let face_groups = face_buffers
            .iter()
            .map(|buffer| create_buffer_bind_group(device, "Point Shadow Face Bind Group", &face_layout, buffer))
            .collect();

        let point_layouts = [&face_layout, &layouts.object];
        let point_pipeline = PipelineConfig::new("Point Shadow", point_program, &point_layouts)
            .with_vertex_layouts(vec![MeshVertex::layout()])
            .with_depth(point_shadow::DEPTH_FORMAT, true, wgpu::CompareFunction::LessEqual)
            .with_cull_mode(None)
            .build(device);

        Self {
            enabled: true,
            pipeline,
            shadow_buffer,
            shadow_group,
            point_pipeline,
            face_buffers,
            face_groups,
        }
    }
}

impl RenderStage for ShadowStage {
    fn name(&self) -> &str {
        "shadow"
    }

    fn kind(&self) -> StageKind {
        StageKind::Shadow
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn required_targets(&self) -> &'static [TargetId] {
        &[TargetId::Shadow, TargetId::PointShadow]
    }

    fn on_resize(&mut self, _ctx: &RenderContext, _resources: &FrameResourceSet) {}

    fn prepare(&mut self, frame: &FrameContext<'_>) {
        frame.gpu.queue().write_buffer(
            &self.shadow_buffer,
            0,
            bytemuck::bytes_of(&ShadowUniform::new(frame.light_space)),
        );
        if let Some(shadow) = &frame.point_shadow {
            for (buffer, face) in self.face_buffers.iter().zip(PointShadowFaceUniform::faces(shadow)) {
                frame.gpu.queue().write_buffer(buffer, 0, bytemuck::bytes_of(&face));
            }
        }
    }

    fn execute(&self, frame: &FrameContext<'_>, encoder: &mut wgpu::CommandEncoder) {
        self.execute_directional(frame, encoder);
        self.execute_point(frame, encoder);
    }

    fn memory_bytes(&self) -> u64 {
        self.shadow_buffer.size() + self.face_buffers.iter().map(wgpu::Buffer::size).sum::<u64>()
    }
}

impl ShadowStage {
    fn execute_directional(&self, frame: &FrameContext<'_>, encoder: &mut wgpu::CommandEncoder) {
        let target = frame.resources.target(TargetId::Shadow);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(StageKind::Shadow.label()),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.view("depth"),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        // Without a sun the cleared map leaves every pixel lit.
        if frame.scene.primary_directional_light().is_none() {
            return;
        }

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.shadow_group, &[]);
        let draws = draw_render_list(&mut pass, frame, ObjectSlot(1), None);
        tracing::trace!(draws, "Shadow pass");
    }

    /// Every face is cleared to the far plane, so a frame without a
    /// shadow-casting point light leaves it fully lit.
    fn execute_point(&self, frame: &FrameContext<'_>, encoder: &mut wgpu::CommandEncoder) {
        let target = frame.resources.target(TargetId::PointShadow);
        for (face, group) in self.face_groups.iter().enumerate() {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Point Shadow Face"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: target.layer_view("depth", face as u32),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if frame.point_shadow.is_none() {
                continue;
            }

            pass.set_pipeline(&self.point_pipeline);
            pass.set_bind_group(0, group, &[]);
            let draws = draw_render_list(&mut pass, frame, ObjectSlot(1), None);
            tracing::trace!(face, draws, "Point shadow face");
        }
    }
}
