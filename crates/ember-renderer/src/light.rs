//! Scene lights: a directional sun with shadow mapping and attenuated point lights.

use glam::{Mat4, Vec3};

use crate::constants::{lights, point_shadow, shadow};

/// Directional light configuration
///
/// A directional light simulates a distant light source like the sun, where
/// all rays are parallel. The first directional light in a scene casts the
/// shadow map.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    /// Light direction (normalized, pointing toward light source)
    pub direction: Vec3,
    /// Light color (RGB, may exceed 1.0 for bright sources)
    pub color: Vec3,
    /// Orthographic projection half-size for shadow map (world units)
    pub ortho_size: f32,
    /// Near plane for shadow projection
    pub ortho_near: f32,
    /// Far plane for shadow projection
    pub ortho_far: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(Vec3::new(0.5, 1.0, 0.2), Vec3::ONE)
    }
}

impl DirectionalLight {
    /// Create a directional light shining from `direction`.
    pub fn new(direction: Vec3, color: Vec3) -> Self {
        Self {
            direction: direction.normalize_or(Vec3::Y),
            color,
            ortho_size: 20.0,
            ortho_near: shadow::ORTHO_NEAR,
            ortho_far: 100.0,
        }
    }

    /// Set light direction (will be normalized)
    pub fn set_direction(&mut self, dir: Vec3) {
        self.direction = dir.normalize_or(self.direction);
    }

    /// Light view matrix, looking from the light toward `target`.
    pub fn view_matrix(&self, target: Vec3) -> Mat4 {
        let eye = target + self.direction * self.ortho_far * 0.5;
        let up = if self.direction.abs_diff_eq(Vec3::Y, 1e-3)
            || self.direction.abs_diff_eq(Vec3::NEG_Y, 1e-3)
        {
            Vec3::Z
        } else {
            Vec3::Y
        };
        Mat4::look_at_rh(eye, target, up)
    }

    /// Orthographic projection matrix for the shadow map.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::orthographic_rh(
            -self.ortho_size,
            self.ortho_size,
            -self.ortho_size,
            self.ortho_size,
            self.ortho_near,
            self.ortho_far,
        )
    }

    /// Combined light-space matrix used by the shadow and lighting passes.
    pub fn light_space_matrix(&self, target: Vec3) -> Mat4 {
        self.projection_matrix() * self.view_matrix(target)
    }

    /// Fit the shadow projection to encompass a bounding sphere of `radius`.
    pub fn fit_to_scene(&mut self, radius: f32) {
        let radius = radius.max(1.0);
        self.ortho_size = radius * 1.5;
        self.ortho_far = radius * 4.0;
    }
}

/// Linear and quadratic attenuation terms (the constant term is fixed at 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            linear: lights::DEFAULT_LINEAR,
            quadratic: lights::DEFAULT_QUADRATIC,
        }
    }
}

impl Attenuation {
    /// Distance at which a light of `max_brightness` falls below 5/256.
    ///
    /// Solves `1 + l*d + q*d^2 = 256/5 * max_brightness` for `d`. Returns 0
    /// when no positive finite solution exists.
    pub fn radius(&self, max_brightness: f32) -> f32 {
        let threshold = 256.0 / 5.0 * max_brightness;
        let (l, q) = (self.linear, self.quadratic);

        let radius = if q <= f32::EPSILON {
            if l <= f32::EPSILON {
                return 0.0;
            }
            (threshold - 1.0) / l
        } else {
            let discriminant = l * l - 4.0 * q * (1.0 - threshold);
            if discriminant <= 0.0 {
                return 0.0;
            }
            (-l + discriminant.sqrt()) / (2.0 * q)
        };

        if radius.is_finite() && radius > 0.0 {
            radius
        } else {
            0.0
        }
    }
}

/// Point light with distance attenuation.
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub attenuation: Attenuation,
}

impl PointLight {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            position,
            color,
            attenuation: Attenuation::default(),
        }
    }

    pub fn with_attenuation(mut self, linear: f32, quadratic: f32) -> Self {
        self.attenuation = Attenuation { linear, quadratic };
        self
    }

    /// Light volume radius derived from the brightest color channel.
    pub fn radius(&self) -> f32 {
        self.attenuation.radius(self.color.max_element())
    }
}

/// Look direction and up vector of each face, in +X, -X, +Y, -Y, +Z, -Z order.
const CUBE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Y),
    (Vec3::NEG_X, Vec3::NEG_Y),
    (Vec3::Y, Vec3::Z),
    (Vec3::NEG_Y, Vec3::NEG_Z),
    (Vec3::Z, Vec3::NEG_Y),
    (Vec3::NEG_Z, Vec3::NEG_Y),
];

/// Omnidirectional shadow cast by one point light.
///
/// The scene is rendered once per cube face with a 90 degree perspective
/// from the light; each face stores `distance / far` so the lighting pass
/// can compare linear distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointShadow {
    pub position: Vec3,
    pub near: f32,
    pub far: f32,
}

impl PointShadow {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            near: point_shadow::NEAR,
            far: point_shadow::FAR,
        }
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, self.near, self.far)
    }

    /// View-projection of every face.
    pub fn face_matrices(&self) -> [Mat4; 6] {
        let projection = self.projection();
        CUBE_FACES.map(|(dir, up)| projection * Mat4::look_at_rh(self.position, self.position + dir, up))
    }

    /// Face whose frustum contains `direction` (the dominant axis).
    pub fn face_for(direction: Vec3) -> usize {
        let a = direction.abs();
        if a.x >= a.y && a.x >= a.z {
            if direction.x >= 0.0 { 0 } else { 1 }
        } else if a.y >= a.z {
            if direction.y >= 0.0 { 2 } else { 3 }
        } else if direction.z >= 0.0 {
            4
        } else {
            5
        }
    }

    /// Value stored in the depth target for a surface at `point`.
    pub fn stored_depth(&self, point: Vec3) -> f32 {
        (point.distance(self.position) / self.far).min(1.0)
    }
}

impl From<&PointLight> for PointShadow {
    fn from(light: &PointLight) -> Self {
        Self::new(light.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec4Swizzles;

    #[test]
    fn test_white_light_radius_is_positive_and_finite() {
        let light = PointLight::new(Vec3::ZERO, Vec3::ONE).with_attenuation(0.7, 1.8);
        let radius = light.radius();
        assert!(radius.is_finite());
        assert!(radius > 0.0);
        assert_relative_eq!(radius, 5.0899, epsilon = 1e-3);
    }

    #[test]
    fn test_radius_grows_with_brightness() {
        let attenuation = Attenuation::default();
        let mut previous = attenuation.radius(0.1);
        for step in 2..=20 {
            let radius = attenuation.radius(step as f32 * 0.1);
            assert!(radius > previous, "radius must increase with brightness");
            previous = radius;
        }
    }

    #[test]
    fn test_dim_light_has_zero_radius() {
        let attenuation = Attenuation::default();
        assert_eq!(attenuation.radius(0.0), 0.0);
        assert!(!attenuation.radius(-5.0).is_nan());
    }

    #[test]
    fn test_linear_only_attenuation() {
        let attenuation = Attenuation {
            linear: 1.0,
            quadratic: 0.0,
        };
        assert_relative_eq!(attenuation.radius(1.0), 50.2, epsilon = 1e-4);
    }

    #[test]
    fn test_light_space_maps_target_to_center() {
        let mut light = DirectionalLight::new(Vec3::new(25.0, 50.0, 10.0), Vec3::ONE);
        light.fit_to_scene(10.0);
        let target = Vec3::new(1.0, 0.0, -2.0);
        let clip = light.light_space_matrix(target) * target.extend(1.0);
        let ndc = clip.xyz() / clip.w;
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_vertical_light_has_valid_view() {
        let light = DirectionalLight::new(Vec3::Y, Vec3::ONE);
        assert!(!light.view_matrix(Vec3::ZERO).is_nan());
    }

    #[test]
    fn test_point_shadow_faces_see_their_axis() {
        let shadow = PointShadow::new(Vec3::new(1.0, 2.0, 3.0));
        let matrices = shadow.face_matrices();
        let axes = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];

        for (face, axis) in axes.iter().enumerate() {
            // Slightly off-axis so every face is exercised away from its center.
            let point = shadow.position + *axis * 5.0 + Vec3::splat(0.5);
            assert_eq!(PointShadow::face_for(point - shadow.position), face);

            let clip = matrices[face] * point.extend(1.0);
            let ndc = clip.xyz() / clip.w;
            assert!(clip.w > 0.0, "face {face}");
            assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0, "face {face}: {ndc}");
            assert!((0.0..=1.0).contains(&ndc.z), "face {face}: {ndc}");
        }
    }

    #[test]
    fn test_point_shadow_face_centers() {
        let shadow = PointShadow::new(Vec3::ZERO);
        let clip = shadow.face_matrices()[1] * Vec3::new(-4.0, 0.0, 0.0).extend(1.0);
        assert_relative_eq!(clip.x / clip.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(clip.y / clip.w, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_point_shadow_stored_depth() {
        let light = PointLight::new(Vec3::new(0.0, 5.0, 0.0), Vec3::ONE);
        let shadow = PointShadow::from(&light);
        assert_relative_eq!(shadow.stored_depth(Vec3::ZERO), 5.0 / point_shadow::FAR);
        assert_eq!(shadow.stored_depth(Vec3::new(0.0, 500.0, 0.0)), 1.0);
    }
}
