//! The render system: owns every GPU resource and runs the ordered stages.

mod bindings;
pub mod gpu_resources;
mod uniforms;

pub use bindings::*;
pub use uniforms::*;

use glam::{Mat4, Vec3};

use crate::camera::{CameraUniform, CameraView};
use crate::config::RendererConfig;
use crate::context::RenderContext;
use crate::culling::RenderList;
use crate::error::{Result, ShaderError};
use crate::frame::{FrameResourceSet, needs_resize};
use crate::light::{DirectionalLight, PointShadow};
use crate::registry::StageRegistry;
use crate::resources::{MeshData, MeshHandle, MeshManager, TextureHandle, TextureManager};
use crate::scene::{BoundingBox, Scene};
use crate::settings::RenderSettings;
use crate::shader::{ProgramHandle, ShaderProgramCache, ShaderSource, names};
use crate::stages::{
    DebugOverlayStage, GeometryStage, LightingStage, ShadowStage, SsaoBlurStage, SsaoStage,
};
use crate::traits::{FrameContext, StageKind};

/// Program handles of every stage, resolved once at startup.
#[derive(Debug, Clone, Copy)]
pub struct PassPrograms {
    pub shadow: ProgramHandle,
    pub point_shadow: ProgramHandle,
    pub geometry: ProgramHandle,
    pub ssao: ProgramHandle,
    pub ssao_blur: ProgramHandle,
    pub lighting: ProgramHandle,
    pub debug_box: ProgramHandle,
}

impl PassPrograms {
    /// Looks up every required program; the first missing one is an error.
    pub fn resolve(cache: &ShaderProgramCache) -> Result<Self, ShaderError> {
        let resolve = |name: &str| {
            cache.try_get(name).inspect_err(|err| {
                tracing::error!(%err, "Required shader program is missing");
            })
        };
        Ok(Self {
            shadow: resolve(names::SHADOW_DEPTH)?,
            point_shadow: resolve(names::POINT_SHADOW_DEPTH)?,
            geometry: resolve(names::GEOMETRY_PASS)?,
            ssao: resolve(names::SSAO)?,
            ssao_blur: resolve(names::SSAO_BLUR)?,
            lighting: resolve(names::LIGHTING_PASS)?,
            debug_box: resolve(names::DEBUG_BOX)?,
        })
    }
}

/// Light-space view-projection for the shadow map.
///
/// The light looks at `target`; its orthographic extent covers the sphere
/// around `target` that encloses `scene_bounds`.
pub fn shadow_light_space(sun: &DirectionalLight, target: Vec3, scene_bounds: Option<BoundingBox>) -> Mat4 {
    let mut light = sun.clone();
    if let Some(bounds) = scene_bounds {
        light.fit_to_scene(bounds.radius() + bounds.center().distance(target));
    }
    light.light_space_matrix(target)
}

/// Omnidirectional shadow of the scene's first point light, unless point
/// shadows are turned off.
pub fn point_shadow_for(scene: &Scene, settings: &RenderSettings) -> Option<PointShadow> {
    if !settings.point_shadows_enabled {
        return None;
    }
    scene.shadow_casting_point_light().map(PointShadow::from)
}

/// Returns true the first time an out-of-range `settings` value is seen.
///
/// `last` holds the input last warned about and is reset once the settings
/// are back in range. Floats compare by bit pattern so a held NaN warns once.
fn should_warn_clamped(last: &mut Option<RenderSettings>, settings: &RenderSettings) -> bool {
    if !settings.is_clamped() {
        *last = None;
        return false;
    }
    if last.is_some_and(|prev| prev.bitwise_eq(settings)) {
        return false;
    }
    *last = Some(*settings);
    true
}

/// Owns the GPU context, programs, frame resources, stages, meshes and
/// textures, and renders one frame per [`RenderSystem::render`] call.
pub struct RenderSystem {
    context: RenderContext,
    shaders: ShaderProgramCache,
    programs: PassPrograms,
    layouts: BindingLayouts,
    bindings: FrameBindings,
    resources: FrameResourceSet,
    stages: StageRegistry,
    meshes: MeshManager,
    textures: TextureManager,
    directional_light_target: Vec3,
    projection: Mat4,
    object_uniforms: Vec<ObjectUniform>,
    // Last out-of-range settings warned about, so a held value warns once.
    clamped_input: Option<RenderSettings>,
}

impl RenderSystem {
    /// Compiles every configured program, allocates frame resources and
    /// builds the six stages.
    ///
    /// Programs that fail to compile are logged and omitted; a missing
    /// program required by a stage fails here, before the first frame.
    pub fn new(context: RenderContext, config: &RendererConfig, source: &dyn ShaderSource) -> Result<Self> {
        config.validate()?;

        let mut shaders = ShaderProgramCache::new();
        let failures = shaders.compile_all(context.device(), source, &config.programs);
        if !failures.is_empty() {
            tracing::warn!(failed = failures.len(), compiled = shaders.len(), "Some shader programs were omitted");
        }
        let programs = PassPrograms::resolve(&shaders)?;

        let layouts = BindingLayouts::new(context.device());
        let bindings = FrameBindings::new(&context, &layouts);
        let resources = FrameResourceSet::new(&context, config);
        let textures = TextureManager::new(&context, &layouts.material);

        let mut stages = StageRegistry::new();
        stages.register(ShadowStage::new(
            &context,
            shaders.program(programs.shadow),
            shaders.program(programs.point_shadow),
            &layouts,
        ));
        stages.register(GeometryStage::new(&context, shaders.program(programs.geometry), &layouts));
        stages.register(SsaoStage::new(&context, shaders.program(programs.ssao), &layouts, &resources));
        stages.register(SsaoBlurStage::new(&context, shaders.program(programs.ssao_blur), &resources));
        stages.register(LightingStage::new(
            &context,
            shaders.program(programs.lighting),
            &layouts,
            &resources,
        ));
        stages.register(DebugOverlayStage::new(&context, shaders.program(programs.debug_box)));

        tracing::info!(
            width = context.width(),
            height = context.height(),
            programs = shaders.len(),
            stages = stages.len(),
            "Render system initialized"
        );

        Ok(Self {
            context,
            shaders,
            programs,
            layouts,
            bindings,
            resources,
            stages,
            meshes: MeshManager::new(),
            textures,
            directional_light_target: Vec3::ZERO,
            projection: Mat4::IDENTITY,
            object_uniforms: Vec::new(),
            clamped_input: None,
        })
    }

    /// Handles a viewport change and refreshes the camera.
    ///
    /// Returns true when frame targets were reallocated. Zero-sized
    /// viewports are ignored.
    pub fn update(&mut self, camera: &dyn CameraView, width: u32, height: u32) -> bool {
        let resized = needs_resize(self.resources.viewport(), (width, height));
        if resized {
            self.context.resize(width, height);
            self.resources.resize(&self.context, width, height);
            self.stages.resize_all(&self.context, &self.resources);
        }
        self.update_view(camera);
        resized
    }

    /// Recomputes the projection and uploads the camera uniform.
    pub fn update_view(&mut self, camera: &dyn CameraView) {
        let (width, height) = self.resources.viewport();
        self.projection = camera.projection_matrix(width, height);
        let uniform = CameraUniform::from_matrices(camera.view_matrix(), self.projection, camera.position());
        self.context.update_camera(&uniform);
    }

    /// Renders one frame of `render_list` into `output`.
    ///
    /// `settings` is clamped before use. Stages run in fixed order; a stage
    /// whose targets are incomplete is skipped and its output is undefined.
    pub fn render(
        &mut self,
        camera: &dyn CameraView,
        render_list: &RenderList<'_>,
        scene: &Scene,
        settings: RenderSettings,
        wireframe: bool,
        output: &wgpu::TextureView,
    ) {
        let clamped = settings.clamp();
        if should_warn_clamped(&mut self.clamped_input, &settings) {
            tracing::warn!(?settings, ?clamped, "Render settings out of range, clamped");
        }
        let settings = clamped;
        self.update_view(camera);

        let light_space = self.light_space_matrix(scene);
        let point_shadow = point_shadow_for(scene, &settings);
        let frame_uniform =
            FrameUniform::from_settings(&settings, self.resources.noise_scale(), self.resources.viewport());
        self.bindings.write_frame(self.context.queue(), &frame_uniform);

        self.object_uniforms.clear();
        self.object_uniforms
            .extend(render_list.iter().map(|object| ObjectUniform::from_model(object.transform())));
        self.bindings
            .write_objects(&self.context, &self.layouts, &self.object_uniforms);

        let frame = FrameContext {
            gpu: &self.context,
            resources: &self.resources,
            layouts: &self.layouts,
            bindings: &self.bindings,
            render_list,
            scene,
            meshes: &self.meshes,
            textures: &self.textures,
            settings,
            output,
            wireframe,
            light_space,
            point_shadow,
        };

        self.stages.prepare_all(&frame);
        let mut encoder = self.context.create_encoder("Frame Encoder");
        self.stages.execute_all(&frame, &mut encoder);
        self.context.queue().submit(std::iter::once(encoder.finish()));

        tracing::trace!(objects = render_list.len(), "Frame submitted");
    }

    /// Light-space matrix of the scene's primary directional light, or the
    /// identity when the scene has none.
    pub fn light_space_matrix(&self, scene: &Scene) -> Mat4 {
        match scene.primary_directional_light() {
            Some(sun) => shadow_light_space(sun, self.directional_light_target, scene.compute_bounds()),
            None => Mat4::IDENTITY,
        }
    }

    /// Estimated GPU memory of every texture and buffer this system owns.
    pub fn video_memory_usage_kb(&self) -> u64 {
        let bytes = self.resources.memory_bytes()
            + self.bindings.memory_bytes()
            + self.stages.memory_bytes()
            + self.meshes.memory_bytes()
            + self.textures.memory_bytes()
            + self.context.camera_buffer().size();
        bytes / 1024
    }

    pub fn directional_light_target(&self) -> Vec3 {
        self.directional_light_target
    }

    pub fn set_directional_light_target(&mut self, target: Vec3) {
        self.directional_light_target = target;
    }

    pub fn upload_mesh(&mut self, data: &MeshData) -> MeshHandle {
        self.meshes.create(&self.context, data)
    }

    /// Uploads an RGBA8 diffuse texture; `None` if the pixel data does not
    /// match the dimensions.
    pub fn upload_texture(&mut self, label: &str, width: u32, height: u32, pixels: &[u8]) -> Option<TextureHandle> {
        self.textures
            .create_rgba8(&self.context, &self.layouts.material, label, width, height, pixels)
    }

    pub fn meshes(&self) -> &MeshManager {
        &self.meshes
    }

    pub fn meshes_mut(&mut self) -> &mut MeshManager {
        &mut self.meshes
    }

    pub fn textures(&self) -> &TextureManager {
        &self.textures
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    pub fn resources(&self) -> &FrameResourceSet {
        &self.resources
    }

    pub fn shaders(&self) -> &ShaderProgramCache {
        &self.shaders
    }

    pub fn programs(&self) -> &PassPrograms {
        &self.programs
    }

    pub fn stages(&mut self) -> &mut StageRegistry {
        &mut self.stages
    }

    /// Returns true if wireframe frames use line rasterization.
    pub fn supports_wireframe(&self) -> bool {
        self.context.supports(wgpu::Features::POLYGON_MODE_LINE)
    }

    /// Current projection matrix.
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn set_stage_enabled(&mut self, kind: StageKind, enabled: bool) {
        if let Some(stage) = self.stages.get_mut(kind) {
            stage.set_enabled(enabled);
        }
    }

    /// Releases every GPU resource. Consumes the system so programs are
    /// released exactly once.
    pub fn shutdown(mut self) {
        self.stages.destroy_all();
        self.meshes.clear();
        let released = self.shaders.release();
        tracing::info!(programs = released, "Render system shut down");
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::Vec4Swizzles;

    use super::*;
    use crate::light::PointLight;

    #[test]
    fn test_light_space_keeps_scene_in_clip_volume() {
        let sun = DirectionalLight::new(Vec3::new(25.0, 50.0, 10.0), Vec3::ONE);
        let bounds = BoundingBox::new(Vec3::new(-10.0, 0.0, -10.0), Vec3::new(10.0, 4.0, 10.0));
        let matrix = shadow_light_space(&sun, Vec3::ZERO, Some(bounds));

        for corner in bounds.corners() {
            let clip = matrix * corner.extend(1.0);
            let ndc = clip.xyz() / clip.w;
            assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0, "{corner} -> {ndc}");
            assert!((0.0..=1.0).contains(&ndc.z), "{corner} -> {ndc}");
        }
    }

    #[test]
    fn test_point_shadow_follows_first_light_and_setting() {
        let mut scene = Scene::new();
        let mut settings = RenderSettings::default();
        assert!(point_shadow_for(&scene, &settings).is_none());

        scene.add_point_light(PointLight::new(Vec3::new(0.0, 4.0, 0.0), Vec3::ONE));
        scene.add_point_light(PointLight::new(Vec3::X, Vec3::ONE));
        let shadow = point_shadow_for(&scene, &settings).unwrap();
        assert_eq!(shadow.position, Vec3::new(0.0, 4.0, 0.0));

        settings.point_shadows_enabled = false;
        assert!(point_shadow_for(&scene, &settings).is_none());
    }

    #[test]
    fn test_clamp_warning_fires_once_per_input() {
        let mut last = None;
        let nan = RenderSettings {
            ambient_strength: f32::NAN,
            ..Default::default()
        };
        assert!(should_warn_clamped(&mut last, &nan));
        assert!(!should_warn_clamped(&mut last, &nan));
        assert!(!should_warn_clamped(&mut last, &nan));

        let too_large = RenderSettings {
            ssao_kernel_size: 1000,
            ..Default::default()
        };
        assert!(should_warn_clamped(&mut last, &too_large));
        assert!(!should_warn_clamped(&mut last, &too_large));

        assert!(!should_warn_clamped(&mut last, &RenderSettings::default()));
        assert!(last.is_none());
        assert!(should_warn_clamped(&mut last, &too_large));
    }

    #[test]
    fn test_light_space_targets_center() {
        let sun = DirectionalLight::new(Vec3::Y, Vec3::ONE);
        let matrix = shadow_light_space(&sun, Vec3::new(3.0, 0.0, 0.0), None);
        let clip = matrix * Vec3::new(3.0, 0.0, 0.0).extend(1.0);
        assert_relative_eq!(clip.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(clip.y, 0.0, epsilon = 1e-5);
    }
}
