//! Core error types for the diagram filter pipeline
//!
//! This module defines the common error types used throughout the pipeline.
//! Most of them are absorbed close to where they occur: render failures and
//! timeouts become degraded render outcomes, exhausted conversion chains
//! become the terminal placeholder image. Only [`FilterError::MalformedDocument`]
//! is allowed to escape a whole-document transform.

use thiserror::Error;

/// Core error types for the diagram filter pipeline
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Malformed document: {message}")]
    MalformedDocument { message: String },

    #[error("Render timed out after {seconds}s")]
    RenderTimeout { seconds: u64 },

    #[error("Render error: {message}")]
    RenderFailure { message: String },

    #[error("Conversion exhausted: {message}")]
    ConversionExhausted { message: String },

    #[error("IO error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl FilterError {
    /// Create a new malformed-document error
    pub fn malformed_document(message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            message: message.into(),
        }
    }

    /// Create a new render-timeout error
    pub fn render_timeout(seconds: u64) -> Self {
        Self::RenderTimeout { seconds }
    }

    /// Create a new render-failure error
    pub fn render_failure(message: impl Into<String>) -> Self {
        Self::RenderFailure {
            message: message.into(),
        }
    }

    /// Create a new conversion-exhausted error
    pub fn conversion_exhausted(message: impl Into<String>) -> Self {
        Self::ConversionExhausted {
            message: message.into(),
        }
    }
}
