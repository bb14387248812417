//! Error types.
//!
//! Every fallible operation of the engine returns one of the enums below.
//! Resource creation errors carry a human-readable message and, for shaders,
//! the compiler or linker log verbatim. Uniform errors are expected during
//! normal operation and are usually logged and ignored by the caller.

use std::path::PathBuf;

use thiserror::Error;

/// A call into the graphics device failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The device could not allocate the object.
    #[error("could not create {what}: {reason}")]
    Allocation { what: &'static str, reason: String },

    /// A handle was passed that the device does not know (already released or never created).
    #[error("unknown {what} handle {id}")]
    UnknownHandle { what: &'static str, id: u64 },

    /// Backend specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Shader stage a compile error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ShaderError {
    #[error("could not read shader source '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not compile {stage} shader:\n{log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("could not link program:\n{log}")]
    Link { log: String },

    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl ShaderError {
    /// The compiler or linker log, if this error came from one.
    pub fn log(&self) -> Option<&str> {
        match self {
            ShaderError::Compile { log, .. } | ShaderError::Link { log } => Some(log),
            _ => None,
        }
    }
}

/// A uniform could not be set on a program.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UniformError {
    #[error("could not get uniform location of '{name}'")]
    NotFound { name: String },

    #[error("uniform '{name}' is a {found}, not a {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl UniformError {
    pub fn name(&self) -> &str {
        match self {
            UniformError::NotFound { name } | UniformError::TypeMismatch { name, .. } => name,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, UniformError::NotFound { .. })
    }
}

/// The asset importer could not produce a scene.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("could not load scene from file '{}': {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    #[error("no importer for file '{}'", .0.display())]
    Unsupported(PathBuf),
}

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("could not load image data from '{}': {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("could not read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    #[error(transparent)]
    Import(#[from] ImportError),
}

/// A frame could not be rendered.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A uniform the frame cannot do without (projection, view or model) could not be set.
    #[error("could not set {stage} matrix: {source}")]
    Uniform {
        stage: &'static str,
        #[source]
        source: UniformError,
    },

    #[error(transparent)]
    Device(#[from] DeviceError),
}
