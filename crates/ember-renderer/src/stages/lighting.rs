//! Deferred lighting stage.

use super::{cleared_attachment, load_texture_entry, uniform_entry};
use crate::context::RenderContext;
use crate::frame::{FrameResourceSet, TargetId};
use crate::pipeline::PipelineConfig;
use crate::renderer::gpu_resources::{create_shadow_sampler, create_uniform_buffer};
use crate::renderer::{BindingLayouts, LightsUniform};
use crate::shader::ShaderProgram;
use crate::traits::{FrameContext, RenderStage, StageKind};

/// Combines the G-buffer, blurred occlusion and both shadow maps with the
/// scene's lights into the output view, applying exposure tone mapping when enabled.
pub struct LightingStage {
    enabled: bool,
    pipeline: wgpu::RenderPipeline,
    input_layout: wgpu::BindGroupLayout,
    input_group: wgpu::BindGroup,
    lights_buffer: wgpu::Buffer,
    shadow_sampler: wgpu::Sampler,
}

impl LightingStage {
    pub fn new(
        ctx: &RenderContext,
        program: &ShaderProgram,
        layouts: &BindingLayouts,
        resources: &FrameResourceSet,
    ) -> Self {
        let device = ctx.device();
        let input_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Lighting Input Layout"),
            entries: &[
                load_texture_entry(0),
                load_texture_entry(1),
                load_texture_entry(2),
                load_texture_entry(3),
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Depth,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 5,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
                uniform_entry(6),
                wgpu::BindGroupLayoutEntry {
                    binding: 7,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        sample_type: wgpu::TextureSampleType::Depth,
                    },
                    count: None,
                },
            ],
        });

        let bind_group_layouts = [ctx.camera_bind_group_layout(), &layouts.frame, &input_layout];
        let pipeline = PipelineConfig::new("Lighting", program, &bind_group_layouts)
            .with_color_targets(&[ctx.output_format()])
            .with_cull_mode(None)
            .build(device);

        let lights_buffer = create_uniform_buffer(device, "Lights Buffer", &LightsUniform::default());
        let shadow_sampler = create_shadow_sampler(device);
        let input_group = create_input_group(device, &input_layout, resources, &lights_buffer, &shadow_sampler);

        Self {
            enabled: true,
            pipeline,
            input_layout,
            input_group,
            lights_buffer,
            shadow_sampler,
        }
    }
}

fn view(binding: u32, view: &wgpu::TextureView) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: wgpu::BindingResource::TextureView(view),
    }
}

fn create_input_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    resources: &FrameResourceSet,
    lights: &wgpu::Buffer,
    shadow_sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    let gbuffer = resources.target(TargetId::GBuffer);
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Lighting Input Bind Group"),
        layout,
        entries: &[
            view(0, gbuffer.view("position")),
            view(1, gbuffer.view("normal")),
            view(2, gbuffer.view("albedo")),
            view(3, resources.target(TargetId::SsaoBlur).view("occlusion")),
            view(4, resources.target(TargetId::Shadow).view("depth")),
            wgpu::BindGroupEntry {
                binding: 5,
                resource: wgpu::BindingResource::Sampler(shadow_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 6,
                resource: lights.as_entire_binding(),
            },
            view(7, resources.target(TargetId::PointShadow).view("depth")),
        ],
    })
}

impl RenderStage for LightingStage {
    fn name(&self) -> &str {
        "lighting"
    }

    fn kind(&self) -> StageKind {
        StageKind::Lighting
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn required_targets(&self) -> &'static [TargetId] {
        &[
            TargetId::Shadow,
            TargetId::PointShadow,
            TargetId::GBuffer,
            TargetId::SsaoBlur,
        ]
    }

    fn on_resize(&mut self, ctx: &RenderContext, resources: &FrameResourceSet) {
        self.input_group = create_input_group(
            ctx.device(),
            &self.input_layout,
            resources,
            &self.lights_buffer,
            &self.shadow_sampler,
        );
    }

    fn prepare(&mut self, frame: &FrameContext<'_>) {
        let uniform = LightsUniform::new(
            frame.scene.primary_directional_light(),
            frame.scene.point_lights(),
            frame.light_space,
            frame.point_shadow.as_ref(),
        );
        frame
            .gpu
            .queue()
            .write_buffer(&self.lights_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    fn execute(&self, frame: &FrameContext<'_>, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(StageKind::Lighting.label()),
            color_attachments: &[cleared_attachment(frame.output, wgpu::Color::BLACK)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, frame.gpu.camera_bind_group(), &[]);
        pass.set_bind_group(1, frame.bindings.frame_group(), &[]);
        pass.set_bind_group(2, &self.input_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn memory_bytes(&self) -> u64 {
        self.lights_buffer.size()
    }
}
