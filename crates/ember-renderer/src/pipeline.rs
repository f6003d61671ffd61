//! Render pipeline construction from compiled shader programs.

use crate::shader::{ShaderProgram, ShaderStageKind};

/// Builder for a render pipeline over a compiled [`ShaderProgram`].
///
/// Defaults: triangle list, back-face culling, fill mode, no depth
/// attachment, no vertex buffers.
pub struct PipelineConfig<'a> {
    label: &'a str,
    program: &'a ShaderProgram,
    bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
    color_targets: Vec<Option<wgpu::ColorTargetState>>,
    depth_stencil: Option<wgpu::DepthStencilState>,
    vertex_layouts: Vec<wgpu::VertexBufferLayout<'a>>,
    topology: wgpu::PrimitiveTopology,
    cull_mode: Option<wgpu::Face>,
    polygon_mode: wgpu::PolygonMode,
}

impl<'a> PipelineConfig<'a> {
    pub fn new(
        label: &'a str,
        program: &'a ShaderProgram,
        bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
    ) -> Self {
        Self {
            label,
            program,
            bind_group_layouts,
            color_targets: Vec::new(),
            depth_stencil: None,
            vertex_layouts: Vec::new(),
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
        }
    }

    /// Opaque color targets, one per format, written without blending.
    pub fn with_color_targets(mut self, formats: &[wgpu::TextureFormat]) -> Self {
        self.color_targets = formats
            .iter()
            .map(|&format| {
                Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();
        self
    }

    pub fn with_depth(
        mut self,
        format: wgpu::TextureFormat,
        write_enabled: bool,
        compare: wgpu::CompareFunction,
    ) -> Self {
        self.depth_stencil = Some(wgpu::DepthStencilState {
            format,
            depth_write_enabled: write_enabled,
            depth_compare: compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });
        self
    }

    /// Rasterizer depth bias. Has no effect without a depth attachment.
    pub fn with_depth_bias(mut self, constant: i32, slope_scale: f32) -> Self {
        if let Some(depth) = self.depth_stencil.as_mut() {
            depth.bias = wgpu::DepthBiasState {
                constant,
                slope_scale,
                clamp: 0.0,
            };
        }
        self
    }

    pub fn with_vertex_layouts(mut self, layouts: Vec<wgpu::VertexBufferLayout<'a>>) -> Self {
        self.vertex_layouts = layouts;
        self
    }

    pub fn with_topology(mut self, topology: wgpu::PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_cull_mode(mut self, cull_mode: Option<wgpu::Face>) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    pub fn with_polygon_mode(mut self, mode: wgpu::PolygonMode) -> Self {
        self.polygon_mode = mode;
        self
    }

    pub fn build(self, device: &wgpu::Device) -> wgpu::RenderPipeline {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", self.label)),
            bind_group_layouts: self.bind_group_layouts,
            push_constant_ranges: &[],
        });

        let fragment = self.program.fragment_module().map(|module| wgpu::FragmentState {
            module,
            entry_point: Some(ShaderStageKind::Fragment.entry_point()),
            targets: &self.color_targets,
            compilation_options: Default::default(),
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(self.label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: self.program.vertex_module(),
                entry_point: Some(ShaderStageKind::Vertex.entry_point()),
                buffers: &self.vertex_layouts,
                compilation_options: Default::default(),
            },
            fragment,
            primitive: wgpu::PrimitiveState {
                topology: self.topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: self.cull_mode,
                polygon_mode: self.polygon_mode,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: self.depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }
}
