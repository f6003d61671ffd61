//! Renderer configuration stored as RON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{shadow, ssao, viewport};
use crate::error::ConfigError;
use crate::settings::RenderSettings;
use crate::shader::{EmbeddedShaders, ProgramDescription, ShaderDirectory, ShaderSource, builtin_programs};

/// SSAO sampling data generated at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsaoConfig {
    /// Hemisphere samples in the kernel (at most 64)
    pub kernel_samples: u32,
    /// Side length of the tiling rotation noise texture
    pub noise_size: u32,
    /// Seed for kernel and noise generation
    pub seed: u64,
}

impl Default for SsaoConfig {
    fn default() -> Self {
        Self {
            kernel_samples: ssao::KERNEL_SIZE as u32,
            noise_size: ssao::NOISE_SIZE,
            seed: ssao::DEFAULT_SEED,
        }
    }
}

/// Startup configuration of the render system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    /// Square shadow map resolution, independent of the viewport
    pub shadow_resolution: u32,
    pub ssao: SsaoConfig,
    /// Directory stage paths are read from; `None` uses the built-in sources
    pub shader_root: Option<PathBuf>,
    pub programs: Vec<ProgramDescription>,
    /// Initial pass parameters
    pub settings: RenderSettings,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: viewport::DEFAULT_WIDTH,
            height: viewport::DEFAULT_HEIGHT,
            shadow_resolution: shadow::DEFAULT_RESOLUTION,
            ssao: SsaoConfig::default(),
            shader_root: None,
            programs: builtin_programs(),
            settings: RenderSettings::default(),
        }
    }
}

impl RendererConfig {
    /// Load configuration from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_ron_str(&content)?;
        tracing::info!("Loaded renderer config from {:?}", path);
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file is missing
    /// or invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Using default renderer config ({:?}: {})", path, err);
                Self::default()
            }
        }
    }

    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as pretty-printed RON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_ron_string()?)?;
        tracing::info!("Saved renderer config to {:?}", path);
        Ok(())
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Rejects values the render system cannot start with.
    ///
    /// Out-of-range shadow resolution and SSAO sizes are clamped at use, not
    /// rejected here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "viewport must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.programs.is_empty() {
            return Err(ConfigError::Invalid("no shader programs declared".into()));
        }
        for (i, program) in self.programs.iter().enumerate() {
            if program.name.is_empty() {
                return Err(ConfigError::Invalid(format!("program #{i} has no name")));
            }
            if self.programs[..i].iter().any(|p| p.name == program.name) {
                return Err(ConfigError::Invalid(format!(
                    "program '{}' declared twice",
                    program.name
                )));
            }
        }
        Ok(())
    }

    /// Where stage sources are loaded from.
    pub fn shader_source(&self) -> Box<dyn ShaderSource> {
        match &self.shader_root {
            Some(root) => Box::new(ShaderDirectory::new(root)),
            None => Box::new(EmbeddedShaders),
        }
    }
}
