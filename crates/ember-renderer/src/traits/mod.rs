//! Core traits for the render pipeline.
//!
//! A frame is produced by an ordered list of [`RenderStage`] objects, each
//! tagged with a [`StageKind`] that fixes its position in the frame.

mod render_stage;
mod stage_kind;

pub use render_stage::*;
pub use stage_kind::*;
