//! # Frame Types
//!
//! Shared domain types for raw video frames moving through the processing
//! pipeline: quality labels, frame payloads and the per-frame metadata
//! record that is persisted next to every processed frame.

use thiserror::Error;

mod frame;
mod metadata;
mod quality;

pub use frame::Frame;
pub use metadata::FrameMetadata;
pub use quality::Quality;

/// Number of channels in the canonical pixel layout (RGB24).
pub const CHANNELS: usize = 3;

/// Errors for frame construction and quality parsing.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Invalid quality label '{0}', expected WIDTHxHEIGHT")]
    InvalidQuality(String),

    #[error("Frame data size mismatch for {quality}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        quality: Quality,
        expected: usize,
        actual: usize,
    },
}
