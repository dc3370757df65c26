//! Built-in capability implementations.
//!
//! Thin adapters binding the pure transform bodies in `frame-ops` to the
//! worker-pool protocol. Tests substitute their own [`Capability`]
//! implementations to exercise failure paths.

use std::sync::Arc;

use frame_types::{Frame, FrameMetadata};

use super::worker_pool::{Capability, CapabilityKind, CapabilityOutput};
use crate::Result;

/// The enhance capability.
pub struct EnhanceCapability;

impl Capability for EnhanceCapability {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Enhance
    }

    fn process(&self, frame: &Frame, _metadata: &FrameMetadata) -> Result<CapabilityOutput> {
        Ok(CapabilityOutput::Enhanced(frame_ops::enhance(frame)))
    }
}

/// The recognize_faces capability.
pub struct RecognizeFacesCapability;

impl Capability for RecognizeFacesCapability {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::RecognizeFaces
    }

    fn process(&self, frame: &Frame, _metadata: &FrameMetadata) -> Result<CapabilityOutput> {
        Ok(CapabilityOutput::Faces(frame_ops::detect_faces(frame)))
    }
}

/// The default capability set the service ships with.
pub fn builtin_capabilities() -> Vec<Arc<dyn Capability>> {
    vec![Arc::new(EnhanceCapability), Arc::new(RecognizeFacesCapability)]
}
