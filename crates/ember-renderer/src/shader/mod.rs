//! Shader program descriptions, sources and the program cache.
//!
//! A program is a vertex stage plus an optional fragment stage, each loaded
//! from a named WGSL source. Programs are declared in configuration as a name
//! and an ordered list of `(path, kind)` stage descriptions.

mod cache;
mod reflect;
mod source;

pub use cache::*;
pub use reflect::*;
pub use source::*;

use serde::{Deserialize, Serialize};

/// Names of the programs the render pipeline requires.
pub mod names {
    pub const SHADOW_DEPTH: &str = "ShadowDepth";
    pub const POINT_SHADOW_DEPTH: &str = "PointShadowDepth";
    pub const GEOMETRY_PASS: &str = "GeometryPass";
    pub const SSAO: &str = "SSAO";
    pub const SSAO_BLUR: &str = "SSAOBlur";
    pub const LIGHTING_PASS: &str = "LightingPass";
    pub const DEBUG_BOX: &str = "DebugBox";
}

/// Pipeline stage a shader module is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderStageKind {
    #[serde(alias = "vert")]
    Vertex,
    #[serde(alias = "frag")]
    Fragment,
}

impl ShaderStageKind {
    /// Entry point every module of this kind must export.
    pub fn entry_point(self) -> &'static str {
        match self {
            ShaderStageKind::Vertex => "vs_main",
            ShaderStageKind::Fragment => "fs_main",
        }
    }

    /// WGSL attribute marking the entry point.
    pub fn attribute(self) -> &'static str {
        match self {
            ShaderStageKind::Vertex => "@vertex",
            ShaderStageKind::Fragment => "@fragment",
        }
    }
}

/// One stage of a program: a source path and the stage it compiles for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDescription {
    pub path: String,
    pub kind: ShaderStageKind,
}

impl StageDescription {
    pub fn vertex(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ShaderStageKind::Vertex,
        }
    }

    pub fn fragment(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ShaderStageKind::Fragment,
        }
    }
}

/// A named program and its ordered stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramDescription {
    pub name: String,
    pub stages: Vec<StageDescription>,
}

impl ProgramDescription {
    pub fn new(name: impl Into<String>, stages: Vec<StageDescription>) -> Self {
        Self {
            name: name.into(),
            stages,
        }
    }
}

/// The programs used by the built-in pipeline, backed by [`EmbeddedShaders`].
pub fn builtin_programs() -> Vec<ProgramDescription> {
    use StageDescription as S;
    vec![
        ProgramDescription::new(names::SHADOW_DEPTH, vec![S::vertex("shadow_depth.vert.wgsl")]),
        ProgramDescription::new(
            names::POINT_SHADOW_DEPTH,
            vec![S::vertex("point_shadow.vert.wgsl"), S::fragment("point_shadow.frag.wgsl")],
        ),
        ProgramDescription::new(
            names::GEOMETRY_PASS,
            vec![S::vertex("gbuffer.vert.wgsl"), S::fragment("gbuffer.frag.wgsl")],
        ),
        ProgramDescription::new(
            names::SSAO,
            vec![S::vertex("fullscreen.vert.wgsl"), S::fragment("ssao.frag.wgsl")],
        ),
        ProgramDescription::new(
            names::SSAO_BLUR,
            vec![S::vertex("fullscreen.vert.wgsl"), S::fragment("ssao_blur.frag.wgsl")],
        ),
        ProgramDescription::new(
            names::LIGHTING_PASS,
            vec![S::vertex("fullscreen.vert.wgsl"), S::fragment("lighting.frag.wgsl")],
        ),
        ProgramDescription::new(
            names::DEBUG_BOX,
            vec![S::vertex("debug_box.vert.wgsl"), S::fragment("debug_box.frag.wgsl")],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_kind_from_ron() {
        let stage: StageDescription = ron::from_str(r#"(path: "a.wgsl", kind: frag)"#).unwrap();
        assert_eq!(stage.kind, ShaderStageKind::Fragment);
        let stage: StageDescription = ron::from_str(r#"(path: "a.wgsl", kind: vertex)"#).unwrap();
        assert_eq!(stage.kind, ShaderStageKind::Vertex);
    }

    #[test]
    fn test_builtin_programs_are_unique() {
        let programs = builtin_programs();
        let mut names: Vec<&str> = programs.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 7);
    }
}
