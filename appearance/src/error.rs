//! Error types for the appearance descriptor library

use thiserror::Error;

/// Result type alias for appearance extraction
pub type Result<T> = std::result::Result<T, AppearanceError>;

/// Errors that can occur while building appearance descriptors
#[derive(Error, Debug)]
pub enum AppearanceError {
    #[error("Embedding backend initialization failed: {0}")]
    BackendInit(String),

    #[error("Embedding inference failed: {0}")]
    Inference(String),

    #[error("Descriptor dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppearanceError {
    pub fn backend_init<S: Into<String>>(msg: S) -> Self {
        Self::BackendInit(msg.into())
    }

    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }
}
