//! Capability worker pools and slot accounting.
//!
//! Each capability owns a fixed-size pool of stateful workers. A worker is a
//! long-lived blocking task with a single-slot input channel; it processes
//! one frame at a time and answers on a per-task oneshot. Slot claims are
//! RAII guards backed by a semaphore plus an availability table, so a claim
//! is released exactly once no matter how the dispatch ends.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, info};

use frame_ops::Detection;
use frame_types::{Frame, FrameMetadata};

use crate::{Error, Result};

/// A named per-frame transform backed by a worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    /// Frame enhancement (frame in, frame out).
    Enhance,
    /// Face recognition (frame in, detections out).
    RecognizeFaces,
}

impl CapabilityKind {
    /// Every capability, in canonical order.
    pub const ALL: [CapabilityKind; 2] = [CapabilityKind::Enhance, CapabilityKind::RecognizeFaces];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::Enhance => "enhance",
            CapabilityKind::RecognizeFaces => "recognize_faces",
        }
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one capability run over one frame.
#[derive(Debug, Clone)]
pub enum CapabilityOutput {
    /// Transformed pixels from the enhance capability.
    Enhanced(Frame),
    /// Detections from the recognize_faces capability.
    Faces(Vec<Detection>),
}

/// A per-frame transform body.
///
/// Implementations are pure with respect to the frame: they may keep
/// per-worker state but must not touch shared resources, since one instance
/// is driven concurrently by every worker in its pool.
pub trait Capability: Send + Sync + 'static {
    fn kind(&self) -> CapabilityKind;

    fn process(&self, frame: &Frame, metadata: &FrameMetadata) -> Result<CapabilityOutput>;
}

/// Configuration for one capability pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityPoolConfig {
    /// Fixed number of workers; there is no dynamic resizing.
    pub workers: usize,
    /// Per-task result wait bound in seconds.
    pub task_timeout_secs: u64,
}

impl Default for CapabilityPoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            task_timeout_secs: 30,
        }
    }
}

/// One frame handed to a worker, with the channel its result comes back on.
struct WorkerTask {
    frame: Frame,
    metadata: FrameMetadata,
    reply: oneshot::Sender<Result<CapabilityOutput>>,
}

/// One entry in the pool's availability table.
struct Slot {
    available: bool,
    input: mpsc::Sender<WorkerTask>,
}

/// A fixed-size pool of workers for one capability.
pub struct CapabilityPool {
    kind: CapabilityKind,
    config: CapabilityPoolConfig,
    /// Counts free slots; acquisition waits here instead of spinning.
    semaphore: Arc<Semaphore>,
    /// Availability table; the semaphore guarantees a free entry whenever a
    /// permit is held.
    slots: Mutex<Vec<Slot>>,
    tasks: Mutex<Option<JoinSet<()>>>,
}

impl CapabilityPool {
    /// Spawn the pool's workers and return the running pool.
    pub fn start(capability: Arc<dyn Capability>, config: CapabilityPoolConfig) -> Self {
        let kind = capability.kind();
        let mut join_set = JoinSet::new();
        let mut slots = Vec::with_capacity(config.workers);

        info!(
            "Starting {} worker pool with {} workers",
            kind, config.workers
        );

        for index in 0..config.workers {
            let (input_tx, input_rx) = mpsc::channel::<WorkerTask>(1);
            let capability = capability.clone();

            // Transforms are synchronous CPU work, so each worker runs on
            // the blocking pool and parks on its input channel.
            join_set.spawn_blocking(move || worker_loop(index, capability, input_rx));

            slots.push(Slot {
                available: true,
                input: input_tx,
            });
        }

        Self {
            kind,
            semaphore: Arc::new(Semaphore::new(config.workers)),
            config,
            slots: Mutex::new(slots),
            tasks: Mutex::new(Some(join_set)),
        }
    }

    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    /// Per-task result wait bound.
    pub fn task_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.task_timeout_secs)
    }

    /// Number of tasks currently claiming a slot.
    pub fn in_flight(&self) -> usize {
        self.config.workers - self.semaphore.available_permits()
    }

    /// Claim a free worker slot, waiting until one is available.
    pub async fn acquire(self: &Arc<Self>) -> Result<SlotGuard> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::capability(self.kind.as_str(), "worker pool shut down"))?;

        let index = {
            let mut slots = self.slots.lock();
            match slots.iter().position(|slot| slot.available) {
                Some(index) => {
                    slots[index].available = false;
                    index
                }
                // Unreachable while the permit invariant holds; surfaced as
                // an error rather than a panic.
                None => {
                    return Err(Error::capability(
                        self.kind.as_str(),
                        "availability table out of sync with semaphore",
                    ));
                }
            }
        };

        Ok(SlotGuard {
            pool: self.clone(),
            index,
            _permit: permit,
        })
    }

    fn release(&self, index: usize) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(index) {
            slot.available = true;
        }
    }

    /// Stop all workers and wait for them to exit.
    pub async fn stop(&self) {
        info!("Stopping {} worker pool", self.kind);

        // Dropping the input senders closes the channels; each worker exits
        // once its current task finishes.
        self.slots.lock().clear();

        let join_set = { self.tasks.lock().take() };
        if let Some(mut join_set) = join_set {
            while join_set.join_next().await.is_some() {}
        }

        info!("{} worker pool stopped", self.kind);
    }
}

/// RAII claim on one worker slot.
///
/// Dropping the guard marks the slot available again and returns the
/// semaphore permit, in that order, so a woken waiter always finds a free
/// table entry. Release happens exactly once on every exit path, timeouts
/// included.
pub struct SlotGuard {
    pool: Arc<CapabilityPool>,
    index: usize,
    _permit: OwnedSemaphorePermit,
}

impl SlotGuard {
    pub fn capability(&self) -> CapabilityKind {
        self.pool.kind
    }

    pub fn worker_index(&self) -> usize {
        self.index
    }

    pub fn task_timeout(&self) -> std::time::Duration {
        self.pool.task_timeout()
    }

    /// Hand a frame to the claimed worker and return the reply channel.
    ///
    /// The input channel holds one task. It can still be occupied if an
    /// earlier dispatch timed out and its abandoned task has not been picked
    /// up yet; that submission fails rather than block the dispatch phase.
    pub fn submit(
        &self,
        frame: Frame,
        metadata: FrameMetadata,
    ) -> Result<oneshot::Receiver<Result<CapabilityOutput>>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let task = WorkerTask {
            frame,
            metadata,
            reply: reply_tx,
        };

        let input = {
            let slots = self.pool.slots.lock();
            match slots.get(self.index) {
                Some(slot) => slot.input.clone(),
                None => {
                    return Err(Error::capability(
                        self.pool.kind.as_str(),
                        "worker pool shut down",
                    ));
                }
            }
        };

        input.try_send(task).map_err(|_| {
            Error::capability(
                self.pool.kind.as_str(),
                format!("worker {} input occupied", self.index),
            )
        })?;

        Ok(reply_rx)
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        // The permit field drops after this body, so the table entry is free
        // before any waiter wakes.
        self.pool.release(self.index);
    }
}

fn worker_loop(
    index: usize,
    capability: Arc<dyn Capability>,
    mut input: mpsc::Receiver<WorkerTask>,
) {
    let kind = capability.kind();
    debug!("{} worker {} started", kind, index);

    while let Some(task) = input.blocking_recv() {
        let result = capability.process(&task.frame, &task.metadata);
        // The receiver is gone when the dispatch timed out; the result is
        // dropped and the slot was already released.
        let _ = task.reply.send(result);
    }

    debug!("{} worker {} shutting down", kind, index);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use frame_types::Quality;

    struct Identity;

    impl Capability for Identity {
        fn kind(&self) -> CapabilityKind {
            CapabilityKind::Enhance
        }

        fn process(&self, frame: &Frame, _metadata: &FrameMetadata) -> Result<CapabilityOutput> {
            Ok(CapabilityOutput::Enhanced(frame.clone()))
        }
    }

    fn test_frame() -> (Frame, FrameMetadata) {
        let quality = Quality::new(4, 4);
        let frame = Frame::from_raw(quality, Bytes::from(vec![7u8; quality.frame_len()])).unwrap();
        let metadata = FrameMetadata::compute(&frame, "job", 0, 30.0);
        (frame, metadata)
    }

    #[test]
    fn test_pool_config_default() {
        let config = CapabilityPoolConfig::default();
        assert_eq!(config.workers, 4);
        assert_eq!(config.task_timeout_secs, 30);
    }

    #[test]
    fn test_capability_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&CapabilityKind::RecognizeFaces).unwrap(),
            "\"recognize_faces\""
        );
        let parsed: CapabilityKind = serde_json::from_str("\"enhance\"").unwrap();
        assert_eq!(parsed, CapabilityKind::Enhance);
    }

    #[tokio::test]
    async fn test_dispatch_roundtrip() {
        let pool = Arc::new(CapabilityPool::start(
            Arc::new(Identity),
            CapabilityPoolConfig {
                workers: 1,
                task_timeout_secs: 5,
            },
        ));

        let (frame, metadata) = test_frame();
        let guard = pool.acquire().await.unwrap();
        let reply = guard.submit(frame.clone(), metadata).unwrap();

        match reply.await.unwrap().unwrap() {
            CapabilityOutput::Enhanced(out) => assert_eq!(out.data(), frame.data()),
            other => panic!("unexpected output: {other:?}"),
        }

        drop(guard);
        pool.stop().await;
    }

    #[tokio::test]
    async fn test_pool_bound_holds() {
        let pool = Arc::new(CapabilityPool::start(
            Arc::new(Identity),
            CapabilityPoolConfig {
                workers: 2,
                task_timeout_secs: 5,
            },
        ));

        let first = pool.acquire().await.unwrap();
        let second = pool.acquire().await.unwrap();
        assert_eq!(pool.in_flight(), 2);
        assert_ne!(first.worker_index(), second.worker_index());

        // A third claim must wait until a slot frees up.
        let waiting = tokio::time::timeout(std::time::Duration::from_millis(50), pool.acquire());
        assert!(waiting.await.is_err());

        drop(first);
        let third = pool.acquire().await.unwrap();
        assert_eq!(pool.in_flight(), 2);

        drop(second);
        drop(third);
        assert_eq!(pool.in_flight(), 0);
        pool.stop().await;
    }

    #[tokio::test]
    async fn test_slot_conservation_over_many_claims() {
        let pool = Arc::new(CapabilityPool::start(
            Arc::new(Identity),
            CapabilityPoolConfig {
                workers: 3,
                task_timeout_secs: 5,
            },
        ));

        for _ in 0..50 {
            let guard = pool.acquire().await.unwrap();
            let (frame, metadata) = test_frame();
            let reply = guard.submit(frame, metadata).unwrap();
            reply.await.unwrap().unwrap();
            drop(guard);
        }

        assert_eq!(pool.in_flight(), 0);
        pool.stop().await;
    }
}
