//! Job admission queue.
//!
//! A bounded FIFO of pending jobs plus the active-id set that enforces the
//! "at most one Active slot per job" invariant. Admission itself (the
//! concurrency ceiling) is driven by the processor's admission loop.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use frame_types::Quality;

use super::worker_pool::CapabilityKind;
use crate::{Error, Result};

/// Fps assumed when the job metadata does not carry one.
const DEFAULT_FPS: f64 = 30.0;

fn default_quality_levels() -> Vec<Quality> {
    vec![Quality::new(1280, 720)]
}

fn default_priority() -> String {
    "normal".to_string()
}

fn default_pipeline_config() -> Vec<CapabilityKind> {
    vec![CapabilityKind::Enhance]
}

/// One video processing request.
///
/// `job_id` is caller-supplied and assumed globally unique; it is not
/// validated here, and a missing id is accepted as-is. `priority` is
/// accepted and recorded but does not reorder the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoJob {
    #[serde(default)]
    pub job_id: String,
    /// Source video description; `fps` is honored, everything else is
    /// carried through to downstream collaborators untouched.
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
    #[serde(default = "default_quality_levels")]
    pub quality_levels: Vec<Quality>,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default = "default_pipeline_config")]
    pub pipeline_config: Vec<CapabilityKind>,
}

impl VideoJob {
    /// Source fps from the job metadata, defaulting to 30.
    pub fn fps(&self) -> f64 {
        self.metadata
            .get("fps")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_FPS)
    }

    pub fn wants(&self, capability: CapabilityKind) -> bool {
        self.pipeline_config.contains(&capability)
    }
}

/// Bounded FIFO of pending jobs with active-job tracking.
pub struct JobQueue {
    tx: mpsc::Sender<VideoJob>,
    rx: tokio::sync::Mutex<mpsc::Receiver<VideoJob>>,
    capacity: usize,
    depth: AtomicUsize,
    active: Mutex<HashSet<String>>,
}

impl JobQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
            capacity,
            depth: AtomicUsize::new(0),
            active: Mutex::new(HashSet::new()),
        }
    }

    /// Append a job; returns its queue position (1-based depth after the
    /// insert). A full queue is rejected rather than waited on, so the
    /// submission surface can report backpressure.
    pub fn enqueue(&self, job: VideoJob) -> Result<usize> {
        self.tx.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => Error::QueueFull {
                capacity: self.capacity,
            },
            TrySendError::Closed(_) => Error::other("job queue closed"),
        })?;
        Ok(self.depth.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Await the next pending job. Returns `None` once the queue is closed
    /// and drained.
    pub async fn dequeue(&self) -> Option<VideoJob> {
        let job = self.rx.lock().await.recv().await?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(job)
    }

    /// Number of jobs waiting for admission.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn mark_active(&self, job_id: &str) {
        self.active.lock().insert(job_id.to_string());
    }

    pub fn mark_complete(&self, job_id: &str) {
        self.active.lock().remove(job_id);
    }

    pub fn is_active(&self, job_id: &str) -> bool {
        self.active.lock().contains(job_id)
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str) -> VideoJob {
        VideoJob {
            job_id: id.to_string(),
            metadata: serde_json::Map::new(),
            quality_levels: vec![Quality::new(640, 360)],
            priority: "normal".to_string(),
            pipeline_config: vec![CapabilityKind::Enhance],
        }
    }

    #[test]
    fn test_submission_defaults() {
        let parsed: VideoJob = serde_json::from_str(r#"{"job_id": "j1"}"#).unwrap();
        assert_eq!(parsed.quality_levels, vec![Quality::new(1280, 720)]);
        assert_eq!(parsed.priority, "normal");
        assert_eq!(parsed.pipeline_config, vec![CapabilityKind::Enhance]);
        assert_eq!(parsed.fps(), 30.0);
    }

    #[test]
    fn test_fps_from_metadata() {
        let parsed: VideoJob =
            serde_json::from_str(r#"{"job_id": "j1", "metadata": {"fps": 24}}"#).unwrap();
        assert_eq!(parsed.fps(), 24.0);
    }

    #[tokio::test]
    async fn test_fifo_order_and_depth() {
        let queue = JobQueue::new(8);
        assert_eq!(queue.enqueue(job("a")).unwrap(), 1);
        assert_eq!(queue.enqueue(job("b")).unwrap(), 2);
        assert_eq!(queue.depth(), 2);

        assert_eq!(queue.dequeue().await.unwrap().job_id, "a");
        assert_eq!(queue.dequeue().await.unwrap().job_id, "b");
        assert_eq!(queue.depth(), 0);
    }

    #[test]
    fn test_full_queue_is_rejected() {
        let queue = JobQueue::new(1);
        queue.enqueue(job("a")).unwrap();

        match queue.enqueue(job("b")) {
            Err(Error::QueueFull { capacity }) => assert_eq!(capacity, 1),
            other => panic!("expected QueueFull, got {other:?}"),
        }
    }

    #[test]
    fn test_active_set_tracks_marks() {
        let queue = JobQueue::new(4);
        queue.mark_active("j1");
        queue.mark_active("j1");
        assert_eq!(queue.active_count(), 1);
        assert!(queue.is_active("j1"));

        queue.mark_complete("j1");
        assert_eq!(queue.active_count(), 0);

        // Completing an unknown job is a no-op, not an error.
        queue.mark_complete("missing");
    }
}
