//! Error types for the renderer.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, compiling or linking shader programs.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to read shader source {path:?}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown built-in shader stage: {0}")]
    UnknownStage(String),

    #[error("program '{program}': stage {path} failed to compile: {message}")]
    Compile {
        program: String,
        path: String,
        message: String,
    },

    #[error("program '{program}' failed to link: {message}")]
    Link { program: String, message: String },

    #[error("program '{program}' has invalid stages: {reason}")]
    InvalidStages { program: String, reason: String },

    #[error("shader program not found: {0}")]
    MissingProgram(String),
}

/// Errors raised by frame target completeness checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("target '{target}' is missing attachment '{attachment}'")]
    MissingAttachment {
        target: String,
        attachment: String,
    },

    #[error(
        "target '{target}' attachment '{attachment}' is {actual:?}, expected {expected:?}"
    )]
    SizeMismatch {
        target: String,
        attachment: String,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("target '{target}' attachment '{attachment}' has format {actual:?}, expected {expected:?}")]
    FormatMismatch {
        target: String,
        attachment: String,
        expected: wgpu::TextureFormat,
        actual: wgpu::TextureFormat,
    },

    #[error("target '{target}' attachment '{attachment}' has {actual} layers, expected {expected}")]
    LayerMismatch {
        target: String,
        attachment: String,
        expected: u32,
        actual: u32,
    },

    #[error("target '{target}' has a zero-sized extent")]
    ZeroSized { target: String },

    #[error(
        "target '{target}' of {size:?} x {layers} layers exceeds the device limits \
         ({max_dimension} pixels, {max_layers} layers)"
    )]
    ExceedsLimit {
        target: String,
        size: (u32, u32),
        layers: u32,
        max_dimension: u32,
        max_layers: u32,
    },

    #[error("target '{target}' could not be allocated: {message}")]
    Allocation { target: String, message: String },
}

/// Errors raised while reading or writing renderer configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Deserialization error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level renderer error.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("texture readback failed: {0}")]
    Readback(String),
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
