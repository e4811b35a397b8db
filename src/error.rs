//! Error types for the pipeline.

use thiserror::Error;

/// Main error type for pipeline operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("record generation failed: {0}")]
    Generation(String),

    #[error("demand exhausted with overflow policy `error`")]
    Overflow,

    #[error("failed to spawn {context} context: {reason}")]
    ContextSpawn { context: String, reason: String },

    #[error("edit position {position} out of bounds (len {len})")]
    EditOutOfBounds { position: usize, len: usize },
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
