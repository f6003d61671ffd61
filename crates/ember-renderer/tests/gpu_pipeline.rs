//! End-to-end frames on a real device. Each test returns early when the
//! machine has no usable adapter.

use glam::Vec3;

use ember_renderer::renderer::gpu_resources::{create_output_texture, read_texture_rgba8};
use ember_renderer::resources::primitives;
use ember_renderer::shader::names;
use ember_renderer::{
    Camera, CameraView, DirectionalLight, PointLight, RenderContext, RenderError, RenderObject, RenderSettings,
    RenderSystem, RendererConfig, Scene, ShaderError, StageKind, TargetId, VisibilityCuller,
};

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const WIDTH: u32 = 160;
const HEIGHT: u32 = 120;

fn small_config() -> RendererConfig {
    RendererConfig {
        width: WIDTH,
        height: HEIGHT,
        shadow_resolution: 512,
        ..Default::default()
    }
}

fn context() -> Option<RenderContext> {
    match RenderContext::headless(FORMAT, WIDTH, HEIGHT) {
        Ok(ctx) => Some(ctx),
        Err(err) => {
            eprintln!("skipping GPU test: {err}");
            None
        }
    }
}

fn system() -> Option<RenderSystem> {
    let config = small_config();
    let source = config.shader_source();
    let ctx = context()?;
    Some(RenderSystem::new(ctx, &config, source.as_ref()).expect("render system"))
}

fn lit_scene(system: &mut RenderSystem) -> Scene {
    let mut scene = Scene::new();
    let floor = primitives::plane(5.0);
    let floor_bounds = floor.bounds;
    let floor_mesh = system.upload_mesh(&floor);
    scene.add_object(RenderObject::new("floor", vec![floor_mesh], floor_bounds));

    let cube = primitives::cube();
    let cube_bounds = cube.bounds;
    let cube_mesh = system.upload_mesh(&cube);
    scene.add_object(RenderObject::new("cube", vec![cube_mesh], cube_bounds).with_translation(Vec3::Y * 0.5));

    scene.add_directional_light(DirectionalLight::new(Vec3::new(0.3, 1.0, 0.2), Vec3::ONE));
    scene.add_point_light(PointLight::new(Vec3::new(1.0, 2.0, 1.0), Vec3::new(1.0, 0.8, 0.6)));
    scene
}

fn camera() -> Camera {
    Camera::new(Vec3::new(0.0, 3.0, 6.0)).look_at(Vec3::ZERO)
}

fn render_once(system: &mut RenderSystem, scene: &Scene, settings: RenderSettings, wireframe: bool) -> Vec<u8> {
    let camera = camera();
    system.update(&camera, WIDTH, HEIGHT);
    let (texture, view) = create_output_texture(system.context().device(), FORMAT, WIDTH, HEIGHT);

    let frustum = VisibilityCuller::frustum(camera.view_matrix(), system.projection());
    let list = VisibilityCuller::new().cull(scene.objects(), &frustum);
    system.render(&camera, &list, scene, settings, wireframe, &view);

    read_texture_rgba8(system.context().device(), system.context().queue(), &texture).expect("readback")
}

fn lit_pixels(pixels: &[u8]) -> usize {
    pixels
        .chunks_exact(4)
        .filter(|p| p[0] > 0 || p[1] > 0 || p[2] > 0)
        .count()
}

#[test]
fn test_frame_lights_geometry() {
    let Some(mut system) = system() else { return };
    let scene = lit_scene(&mut system);

    let pixels = render_once(&mut system, &scene, RenderSettings::default(), false);
    assert_eq!(pixels.len(), (WIDTH * HEIGHT * 4) as usize);
    assert!(lit_pixels(&pixels) > 0);
    assert!(system.video_memory_usage_kb() > 0);
    system.shutdown();
}

#[test]
fn test_empty_scene_is_black() {
    let Some(mut system) = system() else { return };
    let scene = Scene::new();
    let pixels = render_once(&mut system, &scene, RenderSettings::default(), false);
    assert_eq!(lit_pixels(&pixels), 0);
}

#[test]
fn test_feature_toggles_render() {
    let Some(mut system) = system() else { return };
    let scene = lit_scene(&mut system);

    let settings = RenderSettings {
        ssao_enabled: false,
        exposure_enabled: false,
        textures_enabled: false,
        show_bounding_boxes: false,
        show_light_markers: false,
        ..Default::default()
    };
    assert!(lit_pixels(&render_once(&mut system, &scene, settings, false)) > 0);

    // Out-of-range values are clamped, not rejected.
    let settings = RenderSettings {
        ssao_kernel_size: 1000,
        exposure: -3.0,
        ..Default::default()
    };
    render_once(&mut system, &scene, settings, true);
}

#[test]
fn test_resize_reallocates_viewport_targets_only() {
    let Some(mut system) = system() else { return };
    let camera = camera();
    let generation = system.resources().generation();

    assert!(!system.update(&camera, WIDTH, HEIGHT));
    assert!(!system.update(&camera, 0, HEIGHT));
    assert_eq!(system.resources().generation(), generation);

    assert!(system.update(&camera, 320, 200));
    let resources = system.resources();
    assert!(resources.generation() > generation);
    assert_eq!(resources.target(TargetId::GBuffer).size(), (320, 200));
    assert_eq!(resources.target(TargetId::SsaoBlur).size(), (320, 200));
    assert_eq!(resources.target(TargetId::Shadow).size(), (512, 512));
    assert_eq!(resources.target(TargetId::PointShadow).size(), (1024, 1024));
    assert!(resources.all_complete(&TargetId::ALL));
}

#[test]
fn test_oversized_viewport_disables_dependent_stages() {
    let Some(mut system) = system() else { return };
    let scene = lit_scene(&mut system);
    let camera = camera();
    let max = system.context().device().limits().max_texture_dimension_2d;

    assert!(system.update(&camera, max + 1, 64));
    let resources = system.resources();
    assert!(!resources.is_complete(TargetId::GBuffer));
    assert!(!resources.is_complete(TargetId::SsaoBlur));
    assert!(resources.is_complete(TargetId::Shadow));
    assert!(resources.is_complete(TargetId::PointShadow));

    // Stages reading the G-buffer are skipped; the frame still submits.
    let (texture, view) = create_output_texture(system.context().device(), FORMAT, WIDTH, HEIGHT);
    let frustum = VisibilityCuller::frustum(camera.view_matrix(), system.projection());
    let list = VisibilityCuller::new().cull(scene.objects(), &frustum);
    system.render(&camera, &list, &scene, RenderSettings::default(), false, &view);
    read_texture_rgba8(system.context().device(), system.context().queue(), &texture).expect("readback");

    assert!(system.update(&camera, WIDTH, HEIGHT));
    assert!(system.resources().all_complete(&TargetId::ALL));
    assert!(lit_pixels(&render_once(&mut system, &scene, RenderSettings::default(), false)) > 0);
}

#[test]
fn test_point_shadow_darkens_occluded_floor() {
    let Some(mut system) = system() else { return };
    let mut scene = Scene::new();
    let floor = primitives::plane(5.0);
    let floor_bounds = floor.bounds;
    let floor_mesh = system.upload_mesh(&floor);
    scene.add_object(RenderObject::new("floor", vec![floor_mesh], floor_bounds));

    let cube = primitives::cube();
    let cube_bounds = cube.bounds;
    let cube_mesh = system.upload_mesh(&cube);
    scene.add_object(RenderObject::new("cube", vec![cube_mesh], cube_bounds).with_translation(Vec3::Y * 0.5));
    scene.add_point_light(PointLight::new(Vec3::new(0.0, 2.5, 0.0), Vec3::ONE));

    let settings = RenderSettings {
        ssao_enabled: false,
        show_bounding_boxes: false,
        show_light_markers: false,
        ..Default::default()
    };
    let shadowed = render_once(&mut system, &scene, settings, false);
    let unshadowed = render_once(
        &mut system,
        &scene,
        RenderSettings {
            point_shadows_enabled: false,
            ..settings
        },
        false,
    );

    let brightness = |pixels: &[u8]| pixels.iter().map(|&b| u64::from(b)).sum::<u64>();
    assert!(brightness(&shadowed) < brightness(&unshadowed));
}

#[test]
fn test_disabled_stage_is_skipped() {
    let Some(mut system) = system() else { return };
    let scene = lit_scene(&mut system);
    system.set_stage_enabled(StageKind::Lighting, false);
    assert!(!system.stages().get(StageKind::Lighting).is_some_and(|s| s.is_enabled()));

    // Without lighting nothing writes the output; overlay is off too.
    let settings = RenderSettings {
        show_bounding_boxes: false,
        show_light_markers: false,
        ..Default::default()
    };
    let pixels = render_once(&mut system, &scene, settings, false);
    assert_eq!(pixels.len(), (WIDTH * HEIGHT * 4) as usize);
}

#[test]
fn test_missing_program_fails_init() {
    let Some(ctx) = context() else { return };
    let mut config = small_config();
    config.programs.retain(|p| p.name != names::DEBUG_BOX);

    let source = config.shader_source();
    match RenderSystem::new(ctx, &config, source.as_ref()) {
        Err(RenderError::Shader(ShaderError::MissingProgram(name))) => assert_eq!(name, names::DEBUG_BOX),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("render system started without {}", names::DEBUG_BOX),
    }
}
