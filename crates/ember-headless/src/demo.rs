//! Demo scene: a textured floor, a ring of cubes, a sun and colored point lights.

use glam::{Quat, Vec3};

use ember_renderer::resources::primitives;
use ember_renderer::{
    BoundingBox, Camera, DirectionalLight, PointLight, RenderObject, RenderSystem, Scene,
};

const CHECKER_SIZE: u32 = 64;
const CHECKER_CELL: u32 = 8;

/// RGBA8 checkerboard.
fn checker_pixels(size: u32, cell: u32, light: [u8; 4], dark: [u8; 4]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let even = ((x / cell) + (y / cell)) % 2 == 0;
            pixels.extend_from_slice(if even { &light } else { &dark });
        }
    }
    pixels
}

/// Uploads the demo meshes and builds the scene.
pub fn build_scene(system: &mut RenderSystem, ring: usize) -> Scene {
    let mut scene = Scene::new();

    let checker = checker_pixels(CHECKER_SIZE, CHECKER_CELL, [210, 210, 210, 255], [90, 90, 90, 255]);
    let floor_texture = system.upload_texture("Floor Checker", CHECKER_SIZE, CHECKER_SIZE, &checker);
    if floor_texture.is_none() {
        tracing::warn!("Floor texture rejected, drawing untextured");
    }

    let mut floor_data = primitives::plane(12.0);
    if let Some(texture) = floor_texture {
        floor_data = floor_data.with_material(texture);
    }
    let floor_bounds = floor_data.bounds;
    let floor_mesh = system.upload_mesh(&floor_data);
    scene.add_object(RenderObject::new("floor", vec![floor_mesh], floor_bounds));

    let cube_data = primitives::cube();
    let cube_bounds = cube_data.bounds;
    let cube_mesh = system.upload_mesh(&cube_data);

    for i in 0..ring {
        let angle = i as f32 / ring.max(1) as f32 * std::f32::consts::TAU;
        let position = Vec3::new(angle.cos() * 6.0, 0.75, angle.sin() * 6.0);
        scene.add_object(
            RenderObject::new(format!("cube_{i}"), vec![cube_mesh], cube_bounds)
                .with_translation(position)
                .with_rotation(Quat::from_rotation_y(angle))
                .with_scale(Vec3::splat(1.5)),
        );
    }

    scene.add_object(
        RenderObject::new("pillar", vec![cube_mesh], cube_bounds)
            .with_translation(Vec3::new(0.0, 2.0, 0.0))
            .with_scale(Vec3::new(1.0, 4.0, 1.0)),
    );

    // Out of view from the orbit; exercises culling.
    scene.add_object(
        RenderObject::new("far_cube", vec![cube_mesh], cube_bounds).with_translation(Vec3::new(0.0, -400.0, 0.0)),
    );

    scene.add_directional_light(DirectionalLight::new(Vec3::new(0.4, 1.0, 0.3), Vec3::splat(0.9)));

    let colors = [
        Vec3::new(2.0, 0.4, 0.2),
        Vec3::new(0.2, 1.5, 0.4),
        Vec3::new(0.3, 0.5, 2.0),
    ];
    for (i, color) in colors.into_iter().enumerate() {
        let angle = i as f32 / colors.len() as f32 * std::f32::consts::TAU + 0.5;
        scene.add_point_light(PointLight::new(Vec3::new(angle.cos() * 3.5, 1.5, angle.sin() * 3.5), color));
    }

    system.set_directional_light_target(scene.compute_bounds().map_or(Vec3::ZERO, |b: BoundingBox| b.center()));

    tracing::info!(
        objects = scene.len(),
        point_lights = scene.point_lights().len(),
        "Built demo scene"
    );
    scene
}

/// Camera orbiting the origin at `frame` of `frames`.
pub fn orbit_camera(frame: u32, frames: u32) -> Camera {
    let angle = frame as f32 / frames.max(1) as f32 * std::f32::consts::TAU;
    let eye = Vec3::new(angle.sin() * 14.0, 7.0, angle.cos() * 14.0);
    Camera::new(eye).look_at(Vec3::new(0.0, 1.0, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checker_pixels() {
        let pixels = checker_pixels(4, 2, [255; 4], [0; 4]);
        assert_eq!(pixels.len(), 64);
        assert_eq!(&pixels[0..4], &[255; 4]);
        // (2, 0) is in the next cell
        assert_eq!(&pixels[8..12], &[0; 4]);
        // (0, 2) as well
        assert_eq!(&pixels[32..36], &[0; 4]);
    }

    #[test]
    fn test_orbit_looks_at_center() {
        use ember_renderer::CameraView;
        let camera = orbit_camera(3, 12);
        let view = camera.view_matrix();
        let center = view.transform_point3(Vec3::new(0.0, 1.0, 0.0));
        assert!(center.x.abs() < 1e-3);
        assert!(center.y.abs() < 1e-3);
        assert!(center.z < 0.0);
    }
}
