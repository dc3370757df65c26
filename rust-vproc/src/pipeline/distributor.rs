//! Per-frame dispatch across capability pools.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, warn};

use frame_ops::Detection;
use frame_types::{Frame, FrameMetadata};

use super::worker_pool::{CapabilityKind, CapabilityOutput, CapabilityPool, SlotGuard};

/// Results collected for one frame, possibly partial: a capability that
/// failed or timed out simply leaves its entry absent, and the frame is
/// persisted with whatever did succeed.
#[derive(Debug, Clone, Default)]
pub struct FrameResults {
    pub enhanced: Option<Frame>,
    pub faces: Option<Vec<Detection>>,
}

impl FrameResults {
    fn record(&mut self, output: CapabilityOutput) {
        match output {
            CapabilityOutput::Enhanced(frame) => self.enhanced = Some(frame),
            CapabilityOutput::Faces(faces) => self.faces = Some(faces),
        }
    }
}

/// Dispatches each frame to one free worker per configured capability and
/// collects the results under a bounded wait.
pub struct Distributor {
    pools: HashMap<CapabilityKind, Arc<CapabilityPool>>,
}

impl Distributor {
    pub fn new(pools: impl IntoIterator<Item = Arc<CapabilityPool>>) -> Self {
        Self {
            pools: pools.into_iter().map(|p| (p.kind(), p)).collect(),
        }
    }

    pub fn pool(&self, kind: CapabilityKind) -> Option<&Arc<CapabilityPool>> {
        self.pools.get(&kind)
    }

    /// Dispatch one frame through every capability in the pipeline config.
    ///
    /// All submissions are issued before any result is awaited, so the
    /// capabilities run concurrently for this frame. Each claimed slot is
    /// released exactly once via its guard, on the success, error and
    /// timeout paths alike.
    pub async fn distribute(
        &self,
        frame: &Frame,
        metadata: &FrameMetadata,
        pipeline_config: &[CapabilityKind],
    ) -> FrameResults {
        let mut pending: Vec<(
            SlotGuard,
            tokio::sync::oneshot::Receiver<crate::Result<CapabilityOutput>>,
        )> = Vec::with_capacity(pipeline_config.len());

        // Claims follow the canonical capability order regardless of the
        // pipeline config's order, so two dispatches can never each hold the
        // slot the other is waiting on.
        let requested = CapabilityKind::ALL
            .into_iter()
            .filter(|kind| pipeline_config.contains(kind));

        for kind in requested {
            let Some(pool) = self.pools.get(&kind) else {
                warn!(capability = %kind, "No worker pool registered for capability");
                continue;
            };

            let guard = match pool.acquire().await {
                Ok(guard) => guard,
                Err(e) => {
                    error!(capability = %kind, error = %e, "Failed to claim a worker slot");
                    continue;
                }
            };

            debug!(
                capability = %kind,
                worker = guard.worker_index(),
                frame_number = metadata.frame_number,
                "Dispatching frame"
            );

            match guard.submit(frame.clone(), metadata.clone()) {
                Ok(reply) => pending.push((guard, reply)),
                // The guard drops here, so the failed claim is released.
                Err(e) => warn!(capability = %kind, error = %e, "Failed to submit frame"),
            }
        }

        let mut results = FrameResults::default();

        for (guard, reply) in pending {
            let kind = guard.capability();
            match tokio::time::timeout(guard.task_timeout(), reply).await {
                Ok(Ok(Ok(output))) => results.record(output),
                Ok(Ok(Err(e))) => {
                    error!(
                        capability = %kind,
                        frame_number = metadata.frame_number,
                        error = %e,
                        "Capability failed"
                    );
                }
                Ok(Err(_)) => {
                    error!(
                        capability = %kind,
                        frame_number = metadata.frame_number,
                        "Worker exited without replying"
                    );
                }
                Err(_) => {
                    error!(
                        capability = %kind,
                        frame_number = metadata.frame_number,
                        "Capability processing timed out"
                    );
                }
            }
            // Explicit for the timeout path: the guard's drop is the single
            // release point for the claimed slot.
            drop(guard);
        }

        results
    }

    /// Stop every pool and wait for their workers to exit.
    pub async fn shutdown(&self) {
        for pool in self.pools.values() {
            pool.stop().await;
        }
    }
}
