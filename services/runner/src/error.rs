//! services/runner/src/error.rs
//!
//! Defines the primary error type for the entire runner service.

use crate::config::ConfigError;
use crate::flow::pipeline::PipelineError;
use assessment_core::ports::PortError;

/// The primary error type for the `runner` service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A fatal submission-pipeline error (there is no fallback for these).
    #[error("Submission error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Represents an error from the underlying HTTP client library.
    #[error("HTTP Error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents a standard Input/Output error (e.g., reading from stdin).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
