use std::path::PathBuf;

use thiserror::Error;

/// Custom Result type for this crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The Error type for cleaning-pipeline operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Configuration validation error: {0}")]
    ConfigValidationError(String),

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    // Input files are checked before every scan, not only at startup.
    #[error("{kind} file not found: {}", path.display())]
    MissingInput { kind: &'static str, path: PathBuf },

    #[error("Alignment file ended before the corpus (corpus line {line})")]
    AlignmentExhausted { line: usize },

    #[error("Component '{component}' failed: {reason}")]
    ComponentError { component: String, reason: String },

    #[error("Invalid translation unit at line {line}: {reason}")]
    RecordError { line: usize, reason: String },

    #[error("Serialization/Deserialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl PipelineError {
    /// Shorthand used by filters and policies to report a failed call.
    pub fn component(component: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::ComponentError {
            component: component.into(),
            reason: reason.into(),
        }
    }
}

impl From<prometheus::Error> for PipelineError {
    fn from(err: prometheus::Error) -> Self {
        PipelineError::Unexpected(format!("Metrics error: {}", err))
    }
}
