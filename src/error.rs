//! Error types for Sprocket

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for Sprocket operations
pub type Result<T> = std::result::Result<T, SprocketError>;

/// Main error type for Sprocket
#[derive(Error, Debug)]
pub enum SprocketError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Configuration parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Asset category '{0}' has a source glob but no build directory")]
    MissingBuildPath(String),

    #[error("Invalid glob '{pattern}': {error}")]
    InvalidGlob { pattern: String, error: String },

    #[error("Invalid length for {field}: '{value}'")]
    InvalidLength { field: String, value: String },

    #[error("Task '{0}' is not defined")]
    TaskNotFound(String),

    #[error("Failed to load environment file: {0}")]
    Env(String),
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid glob '{pattern}': {error}")]
    Glob { pattern: String, error: String },

    #[error("Included file '{}' not found (from {})", target.display(), from.display())]
    IncludeNotFound { target: PathBuf, from: PathBuf },

    #[error("Include cycle: {0}")]
    IncludeCycle(String),

    #[error("Stylesheet {} failed: {error}", path.display())]
    Style { path: PathBuf, error: String },

    #[error("Grid generation failed: {0}")]
    Grid(String),

    #[error("Script bundle failed: {0}")]
    Script(String),

    #[error("Image {} failed: {error}", path.display())]
    Image { path: PathBuf, error: String },

    #[error("Manifest {} is unreadable: {error}", path.display())]
    Manifest { path: PathBuf, error: String },

    #[error("Server error: {0}")]
    Server(String),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Task '{0}' panicked")]
    Panicked(String),

    #[error("{failed} task(s) failed, {skipped} skipped")]
    TasksFailed { failed: usize, skipped: usize },
}

impl ExecutionError {
    /// Attach a path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ExecutionError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Build a `map_err` adapter that records the path an I/O error happened on
pub fn io_at(path: &Path) -> impl FnOnce(io::Error) -> ExecutionError + '_ {
    move |source| ExecutionError::io(path, source)
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;
