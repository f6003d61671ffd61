//! GPU uniform layouts shared by the pipeline stages.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2};

use crate::constants::lights::MAX_POINT_LIGHTS;
use crate::light::{DirectionalLight, PointLight, PointShadow};
use crate::settings::RenderSettings;

fn flag(value: bool) -> f32 {
    if value { 1.0 } else { 0.0 }
}

/// Per-frame pass parameters (48 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FrameUniform {
    /// x: textures enabled, y: ambient strength, z: exposure enabled, w: exposure
    pub shading: [f32; 4],
    /// x: kernel size, y: radius, z: bias, w: enabled
    pub ssao: [f32; 4],
    /// xy: noise scale, zw: viewport size
    pub screen: [f32; 4],
}

impl Default for FrameUniform {
    fn default() -> Self {
        Self::from_settings(&RenderSettings::default(), Vec2::ONE, (1, 1))
    }
}

impl FrameUniform {
    pub fn from_settings(settings: &RenderSettings, noise_scale: Vec2, viewport: (u32, u32)) -> Self {
        Self {
            shading: [
                flag(settings.textures_enabled),
                settings.ambient_strength,
                flag(settings.exposure_enabled),
                settings.exposure,
            ],
            ssao: [
                settings.ssao_kernel_size as f32,
                settings.ssao_radius,
                settings.ssao_bias,
                flag(settings.ssao_enabled),
            ],
            screen: [noise_scale.x, noise_scale.y, viewport.0 as f32, viewport.1 as f32],
        }
    }
}

/// Per-object transform (128 bytes), addressed with a dynamic offset.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    /// Inverse transpose of the model matrix
    pub normal: [[f32; 4]; 4],
}

impl Default for ObjectUniform {
    fn default() -> Self {
        Self::from_model(Mat4::IDENTITY)
    }
}

impl ObjectUniform {
    pub fn from_model(model: Mat4) -> Self {
        let normal = if model.determinant().abs() > f32::EPSILON {
            model.inverse().transpose()
        } else {
            Mat4::IDENTITY
        };
        Self {
            model: model.to_cols_array_2d(),
            normal: normal.to_cols_array_2d(),
        }
    }
}

/// Light-space transform for the shadow pass (64 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ShadowUniform {
    pub light_space: [[f32; 4]; 4],
}

impl Default for ShadowUniform {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY)
    }
}

impl ShadowUniform {
    pub fn new(light_space: Mat4) -> Self {
        Self {
            light_space: light_space.to_cols_array_2d(),
        }
    }
}

/// One face of the point shadow pass (80 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PointShadowFaceUniform {
    pub face: [[f32; 4]; 4],
    /// xyz: light position, w: far plane
    pub light: [f32; 4],
}

impl Default for PointShadowFaceUniform {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl PointShadowFaceUniform {
    /// Uniforms for all six faces, in face order.
    pub fn faces(shadow: &PointShadow) -> [Self; 6] {
        let light = shadow.position.extend(shadow.far).to_array();
        shadow.face_matrices().map(|face| Self {
            face: face.to_cols_array_2d(),
            light,
        })
    }
}

/// A point light as laid out in the lights uniform (48 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct PointLightGpu {
    /// xyz: position, w: light volume radius
    pub position: [f32; 4],
    pub color: [f32; 4],
    /// x: linear, y: quadratic
    pub attenuation: [f32; 4],
}

impl From<&PointLight> for PointLightGpu {
    fn from(light: &PointLight) -> Self {
        Self {
            position: light.position.extend(light.radius()).to_array(),
            color: light.color.extend(1.0).to_array(),
            attenuation: [light.attenuation.linear, light.attenuation.quadratic, 0.0, 0.0],
        }
    }
}

/// Lights consumed by the lighting stage.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightsUniform {
    pub light_space: [[f32; 4]; 4],
    /// xyz: direction toward the sun, w: 1 if a sun is present
    pub sun_direction: [f32; 4],
    pub sun_color: [f32; 4],
    /// x: point light count, y: 1 if point light 0 casts shadows
    pub counts: [u32; 4],
    /// View-projection of each point shadow face
    pub point_shadow_faces: [[[f32; 4]; 4]; 6],
    /// xyz: shadow-casting light position, w: far plane
    pub point_shadow: [f32; 4],
    pub points: [PointLightGpu; MAX_POINT_LIGHTS],
}

impl Default for LightsUniform {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl LightsUniform {
    /// Packs the scene lights. Point lights past the uniform capacity are
    /// dropped with a warning.
    ///
    /// `point_shadow` belongs to the first point light when present.
    pub fn new(
        sun: Option<&DirectionalLight>,
        points: &[PointLight],
        light_space: Mat4,
        point_shadow: Option<&PointShadow>,
    ) -> Self {
        let mut uniform = Self::zeroed();
        uniform.light_space = light_space.to_cols_array_2d();

        if let Some(shadow) = point_shadow.filter(|_| !points.is_empty()) {
            uniform.counts[1] = 1;
            uniform.point_shadow_faces = shadow.face_matrices().map(|m| m.to_cols_array_2d());
            uniform.point_shadow = shadow.position.extend(shadow.far).to_array();
        }

        if let Some(sun) = sun {
            uniform.sun_direction = sun.direction.extend(1.0).to_array();
            uniform.sun_color = sun.color.extend(1.0).to_array();
        }

        if points.len() > MAX_POINT_LIGHTS {
            tracing::warn!(
                count = points.len(),
                max = MAX_POINT_LIGHTS,
                "Too many point lights; extra lights are ignored"
            );
        }
        let count = points.len().min(MAX_POINT_LIGHTS);
        for (slot, light) in uniform.points.iter_mut().zip(points) {
            *slot = PointLightGpu::from(light);
        }
        uniform.counts[0] = count as u32;
        uniform
    }

    pub fn point_count(&self) -> usize {
        self.counts[0] as usize
    }

    pub fn has_point_shadow(&self) -> bool {
        self.counts[1] != 0
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::Vec3;

    use super::*;

    #[test]
    fn test_uniform_sizes() {
        assert_eq!(std::mem::size_of::<FrameUniform>(), 48);
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 128);
        assert_eq!(std::mem::size_of::<ShadowUniform>(), 64);
        assert_eq!(std::mem::size_of::<PointLightGpu>(), 48);
        assert_eq!(std::mem::size_of::<PointShadowFaceUniform>(), 80);
        assert_eq!(
            std::mem::size_of::<LightsUniform>(),
            64 + 48 + 6 * 64 + 16 + 48 * MAX_POINT_LIGHTS
        );
    }

    #[test]
    fn test_frame_uniform_from_settings() {
        let settings = RenderSettings {
            textures_enabled: false,
            ssao_kernel_size: 16,
            ..Default::default()
        };
        let uniform = FrameUniform::from_settings(&settings, Vec2::new(200.0, 150.0), (800, 600));
        assert_eq!(uniform.shading[0], 0.0);
        assert_eq!(uniform.ssao[0], 16.0);
        assert_eq!(uniform.screen, [200.0, 150.0, 800.0, 600.0]);
    }

    #[test]
    fn test_normal_matrix_for_scaled_model() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let uniform = ObjectUniform::from_model(model);
        assert_relative_eq!(uniform.normal[0][0], 0.5);
        assert_relative_eq!(uniform.normal[1][1], 1.0);
    }

    #[test]
    fn test_degenerate_model_keeps_identity_normal() {
        let uniform = ObjectUniform::from_model(Mat4::from_scale(Vec3::ZERO));
        assert_eq!(uniform.normal, Mat4::IDENTITY.to_cols_array_2d());
    }

    #[test]
    fn test_lights_packing() {
        let sun = DirectionalLight::new(Vec3::Y, Vec3::splat(2.0));
        let points = vec![PointLight::new(Vec3::X, Vec3::ONE); 40];
        let uniform = LightsUniform::new(Some(&sun), &points, Mat4::IDENTITY, None);

        assert_eq!(uniform.point_count(), MAX_POINT_LIGHTS);
        assert!(!uniform.has_point_shadow());
        assert_eq!(uniform.sun_direction[3], 1.0);
        assert!(uniform.points[0].position[3] > 0.0);
        assert_eq!(uniform.points[0].attenuation[0], 0.7);
    }

    #[test]
    fn test_no_sun() {
        let uniform = LightsUniform::new(None, &[], Mat4::IDENTITY, None);
        assert_eq!(uniform.sun_direction[3], 0.0);
        assert_eq!(uniform.point_count(), 0);
    }

    #[test]
    fn test_point_shadow_packing() {
        let light = PointLight::new(Vec3::new(1.0, 2.0, 3.0), Vec3::ONE);
        let shadow = PointShadow::from(&light);
        let uniform = LightsUniform::new(None, std::slice::from_ref(&light), Mat4::IDENTITY, Some(&shadow));

        assert!(uniform.has_point_shadow());
        assert_eq!(uniform.point_shadow, [1.0, 2.0, 3.0, shadow.far]);
        assert_eq!(uniform.point_shadow_faces[4], shadow.face_matrices()[4].to_cols_array_2d());

        // A shadow without any point light is ignored.
        let uniform = LightsUniform::new(None, &[], Mat4::IDENTITY, Some(&shadow));
        assert!(!uniform.has_point_shadow());
    }

    #[test]
    fn test_point_shadow_face_uniforms() {
        let shadow = PointShadow::new(Vec3::Y);
        let faces = PointShadowFaceUniform::faces(&shadow);
        assert_eq!(faces[0].light, [0.0, 1.0, 0.0, shadow.far]);
        assert_eq!(faces[2].face, shadow.face_matrices()[2].to_cols_array_2d());
    }
}
