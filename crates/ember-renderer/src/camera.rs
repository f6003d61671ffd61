//! Camera interface consumed by the renderer.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::constants::camera as defaults;

/// What the renderer needs from a camera.
pub trait CameraView {
    fn view_matrix(&self) -> Mat4;

    /// Projection for a viewport of the given size.
    fn projection_matrix(&self, width: u32, height: u32) -> Mat4;

    /// World-space eye position.
    fn position(&self) -> Vec3;
}

/// Perspective camera oriented by yaw and pitch (Y up).
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Rotation about +Y in radians; zero looks down -Z.
    pub yaw: f32,
    /// Elevation in radians, clamped just short of straight up/down.
    pub pitch: f32,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 8.0),
            yaw: 0.0,
            pitch: 0.0,
            fov_y: defaults::FOV_Y_DEGREES.to_radians(),
            near: defaults::NEAR,
            far: defaults::FAR,
        }
    }
}

impl Camera {
    const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Orients the camera toward `target`.
    pub fn look_at(mut self, target: Vec3) -> Self {
        let dir = (target - self.position).normalize_or(Vec3::NEG_Z);
        self.pitch = dir.y.asin().clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
        self.yaw = dir.x.atan2(-dir.z);
        self
    }

    /// Unit view direction.
    pub fn front(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT).sin_cos();
        Vec3::new(sy * cp, sp, -cy * cp)
    }
}

impl CameraView for Camera {
    fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.front(), Vec3::Y)
    }

    fn projection_matrix(&self, width: u32, height: u32) -> Mat4 {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    fn position(&self) -> Vec3 {
        self.position
    }
}

/// Camera uniform buffer data sent to GPU (336 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub inv_view: [[f32; 4]; 4],
    pub inv_proj: [[f32; 4]; 4],
    /// Eye position (w = 1)
    pub position: [f32; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::from_matrices(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO)
    }
}

impl CameraUniform {
    pub fn from_matrices(view: Mat4, proj: Mat4, position: Vec3) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            view_proj: (proj * view).to_cols_array_2d(),
            inv_view: view.inverse().to_cols_array_2d(),
            inv_proj: proj.inverse().to_cols_array_2d(),
            position: position.extend(1.0).to_array(),
        }
    }

    pub fn from_camera(camera: &dyn CameraView, width: u32, height: u32) -> Self {
        Self::from_matrices(
            camera.view_matrix(),
            camera.projection_matrix(width, height),
            camera.position(),
        )
    }
}
