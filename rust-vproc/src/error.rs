//! Application-wide error types.

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Frame error: {0}")]
    Frame(#[from] frame_types::FrameError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Frame source not found for job {job_id}, quality {quality}")]
    MissingFrameSource { job_id: String, quality: String },

    #[error("Job queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("Capability {capability} failed: {reason}")]
    Capability {
        capability: &'static str,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn capability(capability: &'static str, reason: impl Into<String>) -> Self {
        Self::Capability {
            capability,
            reason: reason.into(),
        }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
