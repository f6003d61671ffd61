//! Where stage sources come from.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::ShaderError;

/// Resolves a stage path to WGSL source text.
pub trait ShaderSource {
    fn load(&self, path: &str) -> Result<String, ShaderError>;
}

/// Sources compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedShaders;

impl EmbeddedShaders {
    /// Paths of every embedded stage.
    pub const PATHS: [&'static str; 11] = [
        "shadow_depth.vert.wgsl",
        "point_shadow.vert.wgsl",
        "point_shadow.frag.wgsl",
        "gbuffer.vert.wgsl",
        "gbuffer.frag.wgsl",
        "fullscreen.vert.wgsl",
        "ssao.frag.wgsl",
        "ssao_blur.frag.wgsl",
        "lighting.frag.wgsl",
        "debug_box.vert.wgsl",
        "debug_box.frag.wgsl",
    ];
}

impl ShaderSource for EmbeddedShaders {
    fn load(&self, path: &str) -> Result<String, ShaderError> {
        let source = match path {
            "shadow_depth.vert.wgsl" => include_str!("../shaders/shadow_depth.vert.wgsl"),
            "point_shadow.vert.wgsl" => include_str!("../shaders/point_shadow.vert.wgsl"),
            "point_shadow.frag.wgsl" => include_str!("../shaders/point_shadow.frag.wgsl"),
            "gbuffer.vert.wgsl" => include_str!("../shaders/gbuffer.vert.wgsl"),
            "gbuffer.frag.wgsl" => include_str!("../shaders/gbuffer.frag.wgsl"),
            "fullscreen.vert.wgsl" => include_str!("../shaders/fullscreen.vert.wgsl"),
            "ssao.frag.wgsl" => include_str!("../shaders/ssao.frag.wgsl"),
            "ssao_blur.frag.wgsl" => include_str!("../shaders/ssao_blur.frag.wgsl"),
            "lighting.frag.wgsl" => include_str!("../shaders/lighting.frag.wgsl"),
            "debug_box.vert.wgsl" => include_str!("../shaders/debug_box.vert.wgsl"),
            "debug_box.frag.wgsl" => include_str!("../shaders/debug_box.frag.wgsl"),
            other => return Err(ShaderError::UnknownStage(other.to_string())),
        };
        Ok(source.to_string())
    }
}

/// Sources read from a directory on disk.
#[derive(Debug, Clone)]
pub struct ShaderDirectory {
    root: PathBuf,
}

impl ShaderDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ShaderSource for ShaderDirectory {
    fn load(&self, path: &str) -> Result<String, ShaderError> {
        let full = self.root.join(path);
        std::fs::read_to_string(&full).map_err(|source| ShaderError::Source { path: full, source })
    }
}

/// Sources held in memory, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct InlineShaders {
    sources: HashMap<String, String>,
}

impl InlineShaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, source: impl Into<String>) -> Self {
        self.sources.insert(path.into(), source.into());
        self
    }
}

impl ShaderSource for InlineShaders {
    fn load(&self, path: &str) -> Result<String, ShaderError> {
        self.sources
            .get(path)
            .cloned()
            .ok_or_else(|| ShaderError::UnknownStage(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_embedded_path_loads() {
        for path in EmbeddedShaders::PATHS {
            assert!(!EmbeddedShaders.load(path).unwrap().is_empty(), "{path}");
        }
    }

    #[test]
    fn test_unknown_embedded_path() {
        assert!(matches!(
            EmbeddedShaders.load("nope.wgsl"),
            Err(ShaderError::UnknownStage(_))
        ));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = ShaderDirectory::new("/definitely/not/here");
        match dir.load("x.wgsl") {
            Err(ShaderError::Source { path, .. }) => assert!(path.ends_with("x.wgsl")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
