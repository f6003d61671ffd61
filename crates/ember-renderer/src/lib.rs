//! Ember Renderer
//!
//! Frame composition core for a deferred wgpu renderer.
//!
//! # Architecture
//!
//! A frame runs six stages in a fixed order: shadow depth, geometry
//! (G-buffer), SSAO, SSAO blur, lighting and the debug overlay.
//!
//! - [`culling::VisibilityCuller`] - Frustum culling into a [`culling::RenderList`]
//! - [`shader::ShaderProgramCache`] - Compiles and names shader programs
//! - [`frame::FrameResourceSet`] - Offscreen targets, SSAO kernel and noise
//! - [`traits::RenderStage`] - Trait implemented by every stage
//! - [`registry::StageRegistry`] - Ordered list of stages
//! - [`renderer::RenderSystem`] - Owns everything and renders frames
//! - [`stats::FrameStatsCollector`] - FPS, frame time and memory sampling
//!
//! # Example
//!
//! ```ignore
//! use ember_renderer::{RenderSystem, RendererConfig, VisibilityCuller};
//!
//! let config = RendererConfig::load_or_default("config/renderer.ron");
//! let mut system = RenderSystem::new(context, &config, config.shader_source().as_ref())?;
//!
//! system.update(&camera, width, height);
//! let frustum = VisibilityCuller::frustum(camera.view_matrix(), system.projection());
//! let list = VisibilityCuller::new().cull(scene.objects(), &frustum);
//! system.render(&camera, &list, &scene, settings, false, &output_view);
//! ```

// Core abstractions
pub mod context;
pub mod error;
pub mod registry;
pub mod resources;
pub mod scene;
pub mod shader;
pub mod traits;

pub mod camera;
pub mod config;
pub mod constants;
pub mod culling;
pub mod frame;
pub mod light;
pub mod pipeline;
pub mod renderer;
pub mod settings;
pub mod stages;
pub mod stats;
pub mod vertex;

// Re-exports for convenience
pub use camera::*;
pub use config::{RendererConfig, SsaoConfig};
pub use context::RenderContext;
pub use culling::{RenderList, VisibilityCuller};
pub use error::{ConfigError, RenderError, Result, ShaderError, TargetError};
pub use frame::{FrameResourceSet, TargetId};
pub use light::{DirectionalLight, PointLight, PointShadow};
pub use registry::StageRegistry;
pub use renderer::{PassPrograms, RenderSystem};
pub use resources::{GpuMesh, MeshData, MeshHandle, MeshManager, TextureHandle};
pub use scene::{BoundingBox, Frustum, Ray, RenderObject, Scene, TestResult};
pub use settings::RenderSettings;
pub use shader::{ProgramDescription, ShaderProgramCache, ShaderSource};
pub use stats::{FrameStats, FrameStatsCollector};
pub use traits::{FrameContext, RenderStage, StageKind};
pub use vertex::MeshVertex;
