//! Error types for pathwise-engine
//!
//! Provides unified error handling across the crate.

use thiserror::Error;

/// Main error type for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Per-path analysis exceeded its deadline
    #[error("analysis timed out: {0}")]
    Timeout(String),

    /// Instruction or expression kind the model does not handle
    #[error("unsupported construct: {0}")]
    Unsupported(String),

    /// Analysis error
    #[error("analysis error: {0}")]
    Analysis(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Report persistence error
    #[error("report error: {0}")]
    Report(#[from] pathwise_report::ReportError),
}

impl EngineError {
    /// Create a timeout error naming the interrupted unit of work
    pub fn timeout(what: impl Into<String>) -> Self {
        EngineError::Timeout(what.into())
    }

    /// Create an unsupported-construct error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        EngineError::Unsupported(msg.into())
    }

    /// Create an internal error (alias for analysis error)
    pub fn internal(msg: impl Into<String>) -> Self {
        EngineError::Analysis(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        EngineError::Config(msg.into())
    }

    /// True if this error is the per-path timeout signal
    pub fn is_timeout(&self) -> bool {
        matches!(self, EngineError::Timeout(_))
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
