//! Screen-space ambient occlusion stage.

use super::{NO_OCCLUSION, cleared_attachment, load_texture_entry, uniform_entry};
use crate::constants::ssao;
use crate::context::RenderContext;
use crate::frame::{FrameResourceSet, TargetId};
use crate::pipeline::PipelineConfig;
use crate::renderer::BindingLayouts;
use crate::shader::ShaderProgram;
use crate::traits::{FrameContext, RenderStage, StageKind};

/// Samples the G-buffer with the hemisphere kernel and rotation noise and
/// writes an occlusion factor per pixel into the raw SSAO target.
///
/// When SSAO is disabled the target is still cleared to 1.0 so later
/// stages read "no occlusion".
pub struct SsaoStage {
    enabled: bool,
    pipeline: wgpu::RenderPipeline,
    input_layout: wgpu::BindGroupLayout,
    input_group: wgpu::BindGroup,
}

impl SsaoStage {
    pub fn new(
        ctx: &RenderContext,
        program: &ShaderProgram,
        layouts: &BindingLayouts,
        resources: &FrameResourceSet,
    ) -> Self {
        let device = ctx.device();
        let input_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SSAO Input Layout"),
            entries: &[
                load_texture_entry(0),
                load_texture_entry(1),
                load_texture_entry(2),
                uniform_entry(3),
            ],
        });

        let bind_group_layouts = [ctx.camera_bind_group_layout(), &layouts.frame, &input_layout];
        let pipeline = PipelineConfig::new("SSAO", program, &bind_group_layouts)
            .with_color_targets(&[ssao::OCCLUSION_FORMAT])
            .with_cull_mode(None)
            .build(device);

        let input_group = create_input_group(device, &input_layout, resources);
        Self {
            enabled: true,
            pipeline,
            input_layout,
            input_group,
        }
    }
}

fn create_input_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    resources: &FrameResourceSet,
) -> wgpu::BindGroup {
    let gbuffer = resources.target(TargetId::GBuffer);
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("SSAO Input Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(gbuffer.view("position")),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(gbuffer.view("normal")),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(resources.noise_view()),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: resources.kernel_buffer().as_entire_binding(),
            },
        ],
    })
}

impl RenderStage for SsaoStage {
    fn name(&self) -> &str {
        "ssao"
    }

    fn kind(&self) -> StageKind {
        StageKind::Ssao
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn required_targets(&self) -> &'static [TargetId] {
        &[TargetId::GBuffer, TargetId::SsaoRaw]
    }

    fn on_resize(&mut self, ctx: &RenderContext, resources: &FrameResourceSet) {
        self.input_group = create_input_group(ctx.device(), &self.input_layout, resources);
    }

    fn prepare(&mut self, _frame: &FrameContext<'_>) {}

    fn execute(&self, frame: &FrameContext<'_>, encoder: &mut wgpu::CommandEncoder) {
        let target = frame.resources.target(TargetId::SsaoRaw);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(StageKind::Ssao.label()),
            color_attachments: &[cleared_attachment(target.view("occlusion"), NO_OCCLUSION)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if !frame.settings.ssao_enabled {
            return;
        }

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, frame.gpu.camera_bind_group(), &[]);
        pass.set_bind_group(1, frame.bindings.frame_group(), &[]);
        pass.set_bind_group(2, &self.input_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
