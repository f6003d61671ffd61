//! Runtime-tunable pass parameters.

use serde::{Deserialize, Serialize};

use crate::constants::ssao;

/// Pass parameters read by the pipeline once per frame.
///
/// This is a plain value: the caller owns it, edits it between frames and
/// hands a copy to [`crate::RenderSystem::render`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub ssao_enabled: bool,
    pub ssao_kernel_size: u32,
    pub ssao_radius: f32,
    pub ssao_bias: f32,
    pub textures_enabled: bool,
    pub exposure_enabled: bool,
    pub exposure: f32,
    pub ambient_strength: f32,
    pub show_bounding_boxes: bool,
    pub show_light_markers: bool,
    pub point_shadows_enabled: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            ssao_enabled: true,
            ssao_kernel_size: ssao::KERNEL_SIZE as u32,
            ssao_radius: 0.5,
            ssao_bias: 0.025,
            textures_enabled: true,
            exposure_enabled: true,
            exposure: 1.0,
            ambient_strength: 1.0,
            show_bounding_boxes: true,
            show_light_markers: true,
            point_shadows_enabled: true,
        }
    }
}

impl RenderSettings {
    pub const KERNEL_SIZE_RANGE: (u32, u32) = (ssao::MIN_KERNEL_SIZE, ssao::KERNEL_SIZE as u32);
    pub const RADIUS_RANGE: (f32, f32) = (0.0, 2.0);
    pub const BIAS_RANGE: (f32, f32) = (0.001, 1.0);
    pub const EXPOSURE_RANGE: (f32, f32) = (0.001, 420.0);
    pub const AMBIENT_RANGE: (f32, f32) = (0.001, 1.0);

    /// Create settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with every numeric field forced into its valid range.
    ///
    /// NaN values fall back to the default for that field.
    pub fn clamp(&self) -> Self {
        let defaults = Self::default();
        Self {
            ssao_kernel_size: self
                .ssao_kernel_size
                .clamp(Self::KERNEL_SIZE_RANGE.0, Self::KERNEL_SIZE_RANGE.1),
            ssao_radius: clamp_or(self.ssao_radius, Self::RADIUS_RANGE, defaults.ssao_radius),
            ssao_bias: clamp_or(self.ssao_bias, Self::BIAS_RANGE, defaults.ssao_bias),
            exposure: clamp_or(self.exposure, Self::EXPOSURE_RANGE, defaults.exposure),
            ambient_strength: clamp_or(
                self.ambient_strength,
                Self::AMBIENT_RANGE,
                defaults.ambient_strength,
            ),
            ..*self
        }
    }

    /// Returns true if [`RenderSettings::clamp`] would change anything.
    pub fn is_clamped(&self) -> bool {
        self.clamp() != *self
    }

    /// Equality that compares floats by bit pattern, so NaN equals NaN.
    pub fn bitwise_eq(&self, other: &Self) -> bool {
        let floats = |s: &Self| {
            [s.ssao_radius, s.ssao_bias, s.exposure, s.ambient_strength].map(f32::to_bits)
        };
        let flags = |s: &Self| {
            [
                s.ssao_enabled,
                s.textures_enabled,
                s.exposure_enabled,
                s.show_bounding_boxes,
                s.show_light_markers,
                s.point_shadows_enabled,
            ]
        };
        self.ssao_kernel_size == other.ssao_kernel_size
            && floats(self) == floats(other)
            && flags(self) == flags(other)
    }

    pub fn set_ssao_kernel_size(&mut self, size: u32) {
        self.ssao_kernel_size = size;
    }

    pub fn set_ssao_radius(&mut self, radius: f32) {
        self.ssao_radius = radius;
    }

    pub fn set_ssao_bias(&mut self, bias: f32) {
        self.ssao_bias = bias;
    }

    pub fn set_exposure(&mut self, exposure: f32) {
        self.exposure = exposure;
    }

    pub fn set_ambient_strength(&mut self, strength: f32) {
        self.ambient_strength = strength;
    }

    pub fn toggle_textures(&mut self) {
        self.textures_enabled = !self.textures_enabled;
    }
}

fn clamp_or(value: f32, (lo, hi): (f32, f32), fallback: f32) -> f32 {
    if value.is_nan() { fallback } else { value.clamp(lo, hi) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_in_range() {
        let settings = RenderSettings::default();
        assert_eq!(settings.ssao_kernel_size, 64);
        assert_eq!(settings.ssao_radius, 0.5);
        assert_eq!(settings.ssao_bias, 0.025);
        assert!(!settings.is_clamped());
    }

    #[test]
    fn test_clamp_limits_values() {
        let mut settings = RenderSettings::new();
        settings.set_ssao_kernel_size(1000);
        settings.set_ssao_radius(-3.0);
        settings.set_exposure(0.0);
        settings.set_ambient_strength(f32::NAN);

        assert!(settings.is_clamped());
        let clamped = settings.clamp();
        assert_eq!(clamped.ssao_kernel_size, 64);
        assert_eq!(clamped.ssao_radius, 0.0);
        assert_eq!(clamped.exposure, 0.001);
        assert_eq!(clamped.ambient_strength, 1.0);
    }

    #[test]
    fn test_clamp_keeps_flags() {
        let mut settings = RenderSettings::new();
        settings.toggle_textures();
        settings.ssao_enabled = false;
        let clamped = settings.clamp();
        assert!(!clamped.textures_enabled);
        assert!(!clamped.ssao_enabled);
    }

    #[test]
    fn test_bitwise_eq_matches_nan() {
        let settings = RenderSettings {
            exposure: f32::NAN,
            ..Default::default()
        };
        assert_ne!(settings, settings);
        assert!(settings.bitwise_eq(&settings));
        assert!(!settings.bitwise_eq(&RenderSettings::default()));

        let other = RenderSettings {
            point_shadows_enabled: false,
            ..settings
        };
        assert!(!settings.bitwise_eq(&other));
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let settings: RenderSettings = ron::from_str("(exposure: 2.5)").unwrap();
        assert_eq!(settings.exposure, 2.5);
        assert_eq!(settings.ssao_kernel_size, 64);
        assert!(settings.point_shadows_enabled);
    }
}
