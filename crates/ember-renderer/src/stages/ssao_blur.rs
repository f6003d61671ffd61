//! SSAO blur stage.

use super::{NO_OCCLUSION, cleared_attachment, load_texture_entry};
use crate::constants::ssao;
use crate::context::RenderContext;
use crate::frame::{FrameResourceSet, TargetId};
use crate::pipeline::PipelineConfig;
use crate::shader::ShaderProgram;
use crate::traits::{FrameContext, RenderStage, StageKind};

/// 4x4 box blur of the raw occlusion into the blurred target.
pub struct SsaoBlurStage {
    enabled: bool,
    pipeline: wgpu::RenderPipeline,
    input_layout: wgpu::BindGroupLayout,
    input_group: wgpu::BindGroup,
}

impl SsaoBlurStage {
    pub fn new(ctx: &RenderContext, program: &ShaderProgram, resources: &FrameResourceSet) -> Self {
        let device = ctx.device();
        let input_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SSAO Blur Input Layout"),
            entries: &[load_texture_entry(0)],
        });

        let bind_group_layouts = [&input_layout];
        let pipeline = PipelineConfig::new("SSAO Blur", program, &bind_group_layouts)
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
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("SSAO Blur Input Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::TextureView(
                resources.target(TargetId::SsaoRaw).view("occlusion"),
            ),
        }],
    })
}

impl RenderStage for SsaoBlurStage {
    fn name(&self) -> &str {
        "ssao_blur"
    }

    fn kind(&self) -> StageKind {
        StageKind::SsaoBlur
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn required_targets(&self) -> &'static [TargetId] {
        &[TargetId::SsaoRaw, TargetId::SsaoBlur]
    }

    fn on_resize(&mut self, ctx: &RenderContext, resources: &FrameResourceSet) {
        self.input_group = create_input_group(ctx.device(), &self.input_layout, resources);
    }

    fn prepare(&mut self, _frame: &FrameContext<'_>) {}

    fn execute(&self, frame: &FrameContext<'_>, encoder: &mut wgpu::CommandEncoder) {
        let target = frame.resources.target(TargetId::SsaoBlur);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(StageKind::SsaoBlur.label()),
            color_attachments: &[cleared_attachment(target.view("occlusion"), NO_OCCLUSION)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if !frame.settings.ssao_enabled {
            return;
        }

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.input_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
