//! Error types for kernel-bench operations.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Step of the accelerator pipeline that reported a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStage {
    /// Adapter (platform/device) discovery.
    Adapter,
    /// Logical device and queue creation.
    Device,
    /// Device buffer allocation or upload.
    Buffer,
    /// Kernel program compilation.
    ProgramBuild,
    /// Kernel dispatch.
    Dispatch,
    /// Copying results back to host memory.
    ReadBack,
}

impl fmt::Display for DeviceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Adapter => "adapter",
            Self::Device => "device",
            Self::Buffer => "buffer",
            Self::ProgramBuild => "program build",
            Self::Dispatch => "dispatch",
            Self::ReadBack => "read-back",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while loading inputs or running a kernel strategy.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error (file operations, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A required input or kernel-source file could not be opened.
    #[error("cannot open '{}'", path.display())]
    MissingResource {
        /// Path that failed to open.
        path: PathBuf,
    },

    /// Malformed input data.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the problem.
        message: String,
    },

    /// A required execution capability (worker pool, accelerator) is absent.
    #[error("missing capability: {0}")]
    MissingCapability(String),

    /// An accelerator pipeline step failed.
    #[error("device {stage} failed: {message}")]
    Device {
        /// Pipeline step that failed.
        stage: DeviceStage,
        /// Error message describing the failure.
        message: String,
    },

    /// Configuration parsing error with line number.
    #[error("configuration error at line {line}: {message}")]
    ConfigParse {
        /// Line number where the error occurred (1-indexed).
        line: usize,
        /// Error message describing the issue.
        message: String,
    },

    /// Invalid configuration value.
    #[error("invalid configuration value for '{key}': {message}")]
    ConfigInvalid {
        /// The configuration key with invalid value.
        key: String,
        /// Error message describing why the value is invalid.
        message: String,
    },

    /// Slice length does not match what a kernel expects.
    #[error("length mismatch: expected {expected} elements, got {actual}")]
    LengthMismatch {
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        actual: usize,
    },
}

impl Error {
    /// Shorthand for an [`Error::InvalidInput`].
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into() }
    }

    /// Shorthand for an [`Error::Device`].
    pub(crate) fn device(stage: DeviceStage, message: impl Into<String>) -> Self {
        Self::Device { stage, message: message.into() }
    }

    /// Shorthand for an [`Error::ConfigInvalid`].
    pub(crate) fn config_invalid(key: &str, message: impl Into<String>) -> Self {
        Self::ConfigInvalid { key: key.to_string(), message: message.into() }
    }
}
