//! G-buffer fill stage.

use super::{ObjectSlot, cleared_attachment, draw_render_list};
use crate::constants::gbuffer;
use crate::context::RenderContext;
use crate::frame::{FrameResourceSet, TargetId};
use crate::pipeline::PipelineConfig;
use crate::renderer::BindingLayouts;
use crate::shader::ShaderProgram;
use crate::traits::{FrameContext, RenderStage, StageKind};
use crate::vertex::MeshVertex;

const GBUFFER_COLORS: [wgpu::TextureFormat; 3] = [
    gbuffer::POSITION_FORMAT,
    gbuffer::NORMAL_FORMAT,
    gbuffer::ALBEDO_FORMAT,
];

/// Writes view-space position, normal and albedo for every visible mesh.
///
/// A line-mode variant is built when the device supports
/// `POLYGON_MODE_LINE` and is used for wireframe frames.
pub struct GeometryStage {
    enabled: bool,
    fill_pipeline: wgpu::RenderPipeline,
    line_pipeline: Option<wgpu::RenderPipeline>,
    warned_wireframe: bool,
}

impl GeometryStage {
    pub fn new(ctx: &RenderContext, program: &ShaderProgram, layouts: &BindingLayouts) -> Self {
        let device = ctx.device();
        let bind_group_layouts = [
            ctx.camera_bind_group_layout(),
            &layouts.frame,
            &layouts.object,
            &layouts.material,
        ];

        let config = |label: &'static str| {
            PipelineConfig::new(label, program, &bind_group_layouts)
                .with_vertex_layouts(vec![MeshVertex::layout()])
                .with_color_targets(&GBUFFER_COLORS)
                .with_depth(gbuffer::DEPTH_FORMAT, true, wgpu::CompareFunction::Less)
        };

        let fill_pipeline = config("Geometry").build(device);
        let line_pipeline = ctx.supports(wgpu::Features::POLYGON_MODE_LINE).then(|| {
            config("Geometry Wireframe")
                .with_polygon_mode(wgpu::PolygonMode::Line)
                .with_cull_mode(None)
                .build(device)
        });

        Self {
            enabled: true,
            fill_pipeline,
            line_pipeline,
            warned_wireframe: false,
        }
    }

    pub fn supports_wireframe(&self) -> bool {
        self.line_pipeline.is_some()
    }

    fn pipeline(&self, wireframe: bool) -> &wgpu::RenderPipeline {
        match (&self.line_pipeline, wireframe) {
            (Some(line), true) => line,
            _ => &self.fill_pipeline,
        }
    }
}

impl RenderStage for GeometryStage {
    fn name(&self) -> &str {
        "geometry"
    }

    fn kind(&self) -> StageKind {
        StageKind::Geometry
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn required_targets(&self) -> &'static [TargetId] {
        &[TargetId::GBuffer]
    }

    fn on_resize(&mut self, _ctx: &RenderContext, _resources: &FrameResourceSet) {}

    fn prepare(&mut self, frame: &FrameContext<'_>) {
        if frame.wireframe && self.line_pipeline.is_none() && !self.warned_wireframe {
            tracing::warn!("Wireframe requested but POLYGON_MODE_LINE is unsupported; using fill mode");
            self.warned_wireframe = true;
        }
    }

    fn execute(&self, frame: &FrameContext<'_>, encoder: &mut wgpu::CommandEncoder) {
        let target = frame.resources.target(TargetId::GBuffer);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(StageKind::Geometry.label()),
            color_attachments: &[
                // position w stays 0 where nothing is drawn
                cleared_attachment(target.view("position"), wgpu::Color::TRANSPARENT),
                cleared_attachment(target.view("normal"), wgpu::Color::TRANSPARENT),
                cleared_attachment(target.view("albedo"), wgpu::Color::TRANSPARENT),
            ],
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

        pass.set_pipeline(self.pipeline(frame.wireframe));
        pass.set_bind_group(0, frame.gpu.camera_bind_group(), &[]);
        pass.set_bind_group(1, frame.bindings.frame_group(), &[]);
        let draws = draw_render_list(&mut pass, frame, ObjectSlot(2), Some(3));
        tracing::trace!(draws, wireframe = frame.wireframe, "Geometry pass");
    }
}
