//! # Frame Ops
//!
//! The built-in per-frame transform bodies backing the service's
//! capabilities. Both are pure functions over [`frame_types::Frame`]; the
//! scheduling, slot accounting and timeout handling around them live in the
//! service crate.

mod detect;
mod enhance;

pub use detect::{BoundingBox, Detection, detect_faces};
pub use enhance::enhance;
