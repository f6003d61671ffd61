//! Debug overlay: bounding boxes and point light markers.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::constants::{debug, gbuffer, lights};
use crate::context::RenderContext;
use crate::culling::RenderList;
use crate::frame::{FrameResourceSet, TargetId};
use crate::pipeline::PipelineConfig;
use crate::scene::{BoundingBox, Scene};
use crate::settings::RenderSettings;
use crate::shader::ShaderProgram;
use crate::traits::{FrameContext, RenderStage, StageKind};

/// Box instance data - passed as vertex instance (40 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BoxInstance {
    pub center: [f32; 3],
    pub half_extents: [f32; 3],
    pub color: [f32; 4],
}

impl BoxInstance {
    pub fn new(center: Vec3, half_extents: Vec3, color: [f32; 4]) -> Self {
        Self {
            center: center.to_array(),
            half_extents: half_extents.to_array(),
            color,
        }
    }

    pub fn from_bounds(bounds: &BoundingBox, color: [f32; 4]) -> Self {
        Self::new(bounds.center(), bounds.half_extents(), color)
    }

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<BoxInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 24,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Collects the overlay instances for one frame.
///
/// Visible objects get a box around their world bounds (highlighted when
/// selected); each point light gets a small cube in its own color. At most
/// [`debug::MAX_BOXES`] instances are produced.
pub fn collect_instances(render_list: &RenderList<'_>, scene: &Scene, settings: &RenderSettings) -> Vec<BoxInstance> {
    let mut instances = Vec::new();

    if settings.show_bounding_boxes {
        let selected = scene.selected();
        instances.extend(
            render_list
                .iter()
                .filter(|object| !object.world_bounds().is_empty())
                .map(|object| {
                    let color = if object.selected || selected == Some(object.id) {
                        debug::SELECTED_COLOR
                    } else {
                        debug::BOX_COLOR
                    };
                    BoxInstance::from_bounds(&object.world_bounds(), color)
                }),
        );
    }

    if settings.show_light_markers {
        instances.extend(scene.point_lights().iter().map(|light| {
            let color = light.color.clamp(Vec3::ZERO, Vec3::ONE).extend(1.0).to_array();
            BoxInstance::new(light.position, Vec3::splat(lights::MARKER_HALF_EXTENT), color)
        }));
    }

    if instances.len() > debug::MAX_BOXES {
        tracing::warn!(count = instances.len(), max = debug::MAX_BOXES, "Debug overlay truncated");
        instances.truncate(debug::MAX_BOXES);
    }
    instances
}

/// Unit cube edges as a line list, corners at +-1.
fn unit_cube_lines() -> ([[f32; 3]; 8], [u16; 24]) {
    let corners = [
        [-1.0, -1.0, -1.0],
        [1.0, -1.0, -1.0],
        [1.0, 1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, 1.0],
        [1.0, -1.0, 1.0],
        [1.0, 1.0, 1.0],
        [-1.0, 1.0, 1.0],
    ];
    let edges = [
        0, 1, 1, 2, 2, 3, 3, 0, // back
        4, 5, 5, 6, 6, 7, 7, 4, // front
        0, 4, 1, 5, 2, 6, 3, 7, // sides
    ];
    (corners, edges)
}

/// Draws wireframe boxes over the lit image, depth tested against the
/// G-buffer depth without writing it.
pub struct DebugOverlayStage {
    enabled: bool,
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    instance_count: u32,
}

impl DebugOverlayStage {
    pub fn new(ctx: &RenderContext, program: &ShaderProgram) -> Self {
        let device = ctx.device();

        let position_layout = wgpu::VertexBufferLayout {
            array_stride: 12,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            }],
        };

        let bind_group_layouts = [ctx.camera_bind_group_layout()];
        let pipeline = PipelineConfig::new("Debug Overlay", program, &bind_group_layouts)
            .with_vertex_layouts(vec![position_layout, BoxInstance::layout()])
            .with_color_targets(&[ctx.output_format()])
            .with_depth(gbuffer::DEPTH_FORMAT, false, wgpu::CompareFunction::LessEqual)
            .with_topology(wgpu::PrimitiveTopology::LineList)
            .with_cull_mode(None)
            .build(device);

        let (corners, edges) = unit_cube_lines();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Debug Box Vertex Buffer"),
            contents: bytemuck::cast_slice(&corners),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Debug Box Index Buffer"),
            contents: bytemuck::cast_slice(&edges),
            usage: wgpu::BufferUsages::INDEX,
        });
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Debug Box Instance Buffer"),
            size: (std::mem::size_of::<BoxInstance>() * debug::MAX_BOXES) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            enabled: true,
            pipeline,
            vertex_buffer,
            index_buffer,
            instance_buffer,
            instance_count: 0,
        }
    }
}

impl RenderStage for DebugOverlayStage {
    fn name(&self) -> &str {
        "debug_overlay"
    }

    fn kind(&self) -> StageKind {
        StageKind::DebugOverlay
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
        let instances = collect_instances(frame.render_list, frame.scene, &frame.settings);
        self.instance_count = instances.len() as u32;
        if !instances.is_empty() {
            frame
                .gpu
                .queue()
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }
    }

    fn execute(&self, frame: &FrameContext<'_>, encoder: &mut wgpu::CommandEncoder) {
        if self.instance_count == 0 {
            return;
        }

        let depth = frame.resources.target(TargetId::GBuffer).view("depth");
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(StageKind::DebugOverlay.label()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: frame.output,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, frame.gpu.camera_bind_group(), &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..24, 0, 0..self.instance_count);
    }

    fn memory_bytes(&self) -> u64 {
        self.vertex_buffer.size() + self.index_buffer.size() + self.instance_buffer.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::PointLight;
    use crate::scene::RenderObject;

    fn scene_with_two_objects() -> Scene {
        let mut scene = Scene::new();
        let bounds = BoundingBox::new(Vec3::splat(-1.0), Vec3::ONE);
        scene.add_object(RenderObject::new("a", Vec::new(), bounds).with_translation(Vec3::X * 4.0));
        let b = scene.add_object(RenderObject::new("b", Vec::new(), bounds));
        scene.set_selected(Some(b));
        scene.add_point_light(PointLight::new(Vec3::Y * 3.0, Vec3::new(2.0, 0.5, 0.0)));
        scene
    }

    #[test]
    fn test_instance_layout_size() {
        assert_eq!(std::mem::size_of::<BoxInstance>(), 40);
    }

    #[test]
    fn test_boxes_follow_world_bounds() {
        let scene = scene_with_two_objects();
        let list = RenderList::from_objects(scene.objects());
        let instances = collect_instances(&list, &scene, &RenderSettings::default());

        assert_eq!(instances.len(), 3);
        assert_eq!(instances[0].center, [4.0, 0.0, 0.0]);
        assert_eq!(instances[0].half_extents, [1.0, 1.0, 1.0]);
        assert_eq!(instances[0].color, debug::BOX_COLOR);
        assert_eq!(instances[1].color, debug::SELECTED_COLOR);
    }

    #[test]
    fn test_light_marker() {
        let scene = scene_with_two_objects();
        let list = RenderList::from_objects(scene.objects());
        let instances = collect_instances(&list, &scene, &RenderSettings::default());

        let marker = instances[2];
        assert_eq!(marker.center, [0.0, 3.0, 0.0]);
        assert_eq!(marker.half_extents, [lights::MARKER_HALF_EXTENT; 3]);
        assert_eq!(marker.color, [1.0, 0.5, 0.0, 1.0]);
    }

    #[test]
    fn test_toggles() {
        let scene = scene_with_two_objects();
        let list = RenderList::from_objects(scene.objects());
        let settings = RenderSettings {
            show_bounding_boxes: false,
            ..Default::default()
        };
        assert_eq!(collect_instances(&list, &scene, &settings).len(), 1);

        let settings = RenderSettings {
            show_bounding_boxes: false,
            show_light_markers: false,
            ..Default::default()
        };
        assert!(collect_instances(&list, &scene, &settings).is_empty());
    }

    #[test]
    fn test_empty_bounds_draw_no_box() {
        let mut scene = Scene::new();
        scene.add_object(RenderObject::new("no meshes", Vec::new(), BoundingBox::empty()));
        let list = RenderList::from_objects(scene.objects());
        let settings = RenderSettings {
            show_light_markers: false,
            ..Default::default()
        };

        let instances = collect_instances(&list, &scene, &settings);
        assert!(instances.is_empty());
    }

    #[test]
    fn test_unit_cube_has_twelve_edges() {
        let (corners, edges) = unit_cube_lines();
        assert_eq!(edges.len(), 24);
        assert!(edges.iter().all(|&i| (i as usize) < corners.len()));
    }
}
