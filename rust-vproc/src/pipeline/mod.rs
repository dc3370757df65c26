//! Frame-processing scheduler.
//!
//! The scheduler core of the service:
//! - Bounded job admission under a fixed concurrency ceiling
//! - Per-quality frame streaming and fan-out
//! - Capability worker pools with slot accounting
//! - Per-frame concurrent dispatch-and-collect with timeouts
//! - Persistence of processed frames and their metadata

mod capabilities;
mod distributor;
mod frame_source;
mod job_queue;
mod manager;
mod store;
mod worker_pool;

pub use capabilities::{EnhanceCapability, RecognizeFacesCapability, builtin_capabilities};
pub use distributor::{Distributor, FrameResults};
pub use frame_source::{FrameSource, quality_dir};
pub use job_queue::{JobQueue, VideoJob};
pub use manager::{PipelineEvent, VideoProcessor};
pub use store::FrameStore;
pub use worker_pool::{
    Capability, CapabilityKind, CapabilityOutput, CapabilityPool, CapabilityPoolConfig, SlotGuard,
};
