//! Renderer constants shared across modules.

/// Shadow map constants
pub mod shadow {
    /// Shadow map depth format
    pub const SHADOW_MAP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
    /// Default shadow map resolution (square)
    pub const DEFAULT_RESOLUTION: u32 = 2048;
    /// Smallest accepted shadow map resolution
    pub const MIN_RESOLUTION: u32 = 256;
    /// Largest accepted shadow map resolution
    pub const MAX_RESOLUTION: u32 = 8192;
    /// Constant depth bias applied by the rasterizer in the shadow pass
    pub const DEPTH_BIAS_CONSTANT: i32 = 2;
    /// Slope-scaled depth bias applied in the shadow pass
    pub const DEPTH_BIAS_SLOPE: f32 = 2.0;
    /// Near plane of the light's orthographic projection
    pub const ORTHO_NEAR: f32 = 0.1;
}

/// Omnidirectional point light shadow constants
pub mod point_shadow {
    /// Depth format of the six-face target; stores distance / far plane
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
    /// Side length of each face
    pub const RESOLUTION: u32 = 1024;
    /// Faces in +X, -X, +Y, -Y, +Z, -Z order
    pub const FACES: u32 = 6;
    pub const NEAR: f32 = 0.1;
    pub const FAR: f32 = 25.0;
}

/// G-buffer attachment formats
pub mod gbuffer {
    /// View-space position (w = 1 where geometry was written)
    pub const POSITION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
    /// View-space normal
    pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
    /// Diffuse albedo
    pub const ALBEDO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
    /// Scene depth
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
}

/// Screen-space ambient occlusion constants
pub mod ssao {
    /// Number of hemisphere samples in the kernel buffer
    pub const KERNEL_SIZE: usize = 64;
    /// Smallest kernel size the pass may be asked to use
    pub const MIN_KERNEL_SIZE: u32 = 4;
    /// Side length of the tiling noise texture
    pub const NOISE_SIZE: u32 = 4;
    /// Default seed for kernel and noise generation
    pub const DEFAULT_SEED: u64 = 0x5EED_A0;
    /// Occlusion target format (raw and blurred)
    pub const OCCLUSION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R16Float;
    /// Rotation noise texture format
    pub const NOISE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
}

/// Light constants
pub mod lights {
    /// Maximum number of point lights uploaded per frame
    pub const MAX_POINT_LIGHTS: usize = 32;
    /// Default linear attenuation term
    pub const DEFAULT_LINEAR: f32 = 0.7;
    /// Default quadratic attenuation term
    pub const DEFAULT_QUADRATIC: f32 = 1.8;
    /// Half extent of the cube drawn at each point light
    pub const MARKER_HALF_EXTENT: f32 = 0.125;
}

/// Debug overlay constants
pub mod debug {
    /// Bounding box color for unselected objects
    pub const BOX_COLOR: [f32; 4] = [0.2, 1.0, 0.2, 1.0];
    /// Bounding box color for the selected object
    pub const SELECTED_COLOR: [f32; 4] = [1.0, 0.6, 0.1, 1.0];
    /// Maximum number of boxes drawn per frame
    pub const MAX_BOXES: usize = 4096;
}

/// Viewport constants
pub mod viewport {
    pub const DEFAULT_WIDTH: u32 = 1280;
    pub const DEFAULT_HEIGHT: u32 = 720;
}

/// Camera defaults
pub mod camera {
    /// Vertical field of view in degrees
    pub const FOV_Y_DEGREES: f32 = 45.0;
    pub const NEAR: f32 = 0.1;
    pub const FAR: f32 = 500.0;
}
