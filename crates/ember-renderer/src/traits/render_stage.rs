//! RenderStage trait definition.

use glam::Mat4;

use super::StageKind;
use crate::context::RenderContext;
use crate::culling::RenderList;
use crate::frame::{FrameResourceSet, TargetId};
use crate::light::PointShadow;
use crate::renderer::{BindingLayouts, FrameBindings};
use crate::resources::{MeshManager, TextureManager};
use crate::scene::Scene;
use crate::settings::RenderSettings;

/// Read-only snapshot of everything a stage may consume during one frame.
pub struct FrameContext<'a> {
    pub gpu: &'a RenderContext,
    pub resources: &'a FrameResourceSet,
    pub layouts: &'a BindingLayouts,
    pub bindings: &'a FrameBindings,
    pub render_list: &'a RenderList<'a>,
    pub scene: &'a Scene,
    pub meshes: &'a MeshManager,
    pub textures: &'a TextureManager,
    /// Settings for this frame, already clamped.
    pub settings: RenderSettings,
    /// Final color output.
    pub output: &'a wgpu::TextureView,
    pub wireframe: bool,
    /// View-projection of the primary directional light.
    pub light_space: Mat4,
    /// Omnidirectional shadow of the first point light, if enabled.
    pub point_shadow: Option<PointShadow>,
}

/// One ordered stage of GPU work.
///
/// Stages are composed by [`crate::StageRegistry`], which runs them in
/// [`StageKind`] order. Each stage records its own render pass into the
/// shared command encoder.
pub trait RenderStage: Send + Sync {
    /// Returns the unique name of this stage.
    fn name(&self) -> &str;

    /// Returns the kind, which fixes the stage's position in the frame.
    fn kind(&self) -> StageKind;

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    /// Targets this stage reads or writes. The stage is skipped while any of
    /// them is incomplete.
    fn required_targets(&self) -> &'static [TargetId];

    /// Called after frame targets were reallocated.
    ///
    /// Bind groups referencing targets must be rebuilt here.
    fn on_resize(&mut self, ctx: &RenderContext, resources: &FrameResourceSet);

    /// Upload per-frame data. Called before any stage executes.
    fn prepare(&mut self, frame: &FrameContext<'_>);

    /// Record the stage's render pass.
    fn execute(&self, frame: &FrameContext<'_>, encoder: &mut wgpu::CommandEncoder);

    /// Bytes of GPU memory owned by the stage itself.
    fn memory_bytes(&self) -> u64 {
        0
    }

    /// Called when the stage is being destroyed.
    fn on_destroy(&mut self) {}
}
