//! Video processor orchestration.
//!
//! The processor ties the pieces together: it admits jobs from the queue
//! under a fixed concurrency ceiling, fans each admitted job out across its
//! quality levels, drives every frame through the distributor, persists the
//! results and notifies the encoder collaborator when enhancement finished.

use std::sync::Arc;

use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use frame_types::{FrameMetadata, Quality};

use super::capabilities::builtin_capabilities;
use super::distributor::Distributor;
use super::frame_source::FrameSource;
use super::job_queue::{JobQueue, VideoJob};
use super::store::FrameStore;
use super::worker_pool::{Capability, CapabilityKind, CapabilityPool};
use crate::config::AppConfig;
use crate::encoder::EncoderClient;
use crate::{Error, Result};

/// Events emitted by the processor.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Job accepted into the queue.
    JobQueued { job_id: String, position: usize },
    /// Job admitted and processing.
    JobStarted { job_id: String },
    /// Job finished; all quality streams processed.
    JobCompleted { job_id: String },
    /// Job failed.
    JobFailed { job_id: String, error: String },
}

/// The frame-processing service core.
pub struct VideoProcessor {
    config: AppConfig,
    job_queue: Arc<JobQueue>,
    distributor: Arc<Distributor>,
    store: Arc<FrameStore>,
    encoder: Arc<EncoderClient>,
    /// Admission ceiling; one permit per active job.
    job_slots: Arc<Semaphore>,
    event_tx: broadcast::Sender<PipelineEvent>,
    cancellation_token: CancellationToken,
}

impl VideoProcessor {
    /// Create a processor with an explicit capability set.
    ///
    /// Capabilities are injected rather than global so tests can substitute
    /// doubles for either transform.
    pub fn new(config: AppConfig, capabilities: Vec<Arc<dyn Capability>>) -> Self {
        let (event_tx, _) = broadcast::channel(256);

        let pools = capabilities.into_iter().map(|capability| {
            let pool_config = config.pool_config(capability.kind());
            Arc::new(CapabilityPool::start(capability, pool_config))
        });
        let distributor = Arc::new(Distributor::new(pools));

        Self {
            job_queue: Arc::new(JobQueue::new(config.scheduler.queue_capacity)),
            distributor,
            store: Arc::new(FrameStore::new(config.storage.output_root.clone())),
            encoder: Arc::new(EncoderClient::new(config.encoder.clone())),
            job_slots: Arc::new(Semaphore::new(config.scheduler.max_concurrent_jobs)),
            event_tx,
            cancellation_token: CancellationToken::new(),
            config,
        }
    }

    /// Create a processor with the built-in capabilities.
    pub fn with_defaults(config: AppConfig) -> Self {
        Self::new(config, builtin_capabilities())
    }

    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.job_queue
    }

    /// Subscribe to processor events.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.event_tx.subscribe()
    }

    /// Queue a job for processing; returns its queue position.
    pub fn submit(&self, job: VideoJob) -> Result<usize> {
        let job_id = job.job_id.clone();
        let position = self.job_queue.enqueue(job)?;

        info!(job_id = %job_id, position, "Video job queued");
        let _ = self.event_tx.send(PipelineEvent::JobQueued { job_id, position });
        Ok(position)
    }

    /// Start the admission loop.
    pub fn start(self: &Arc<Self>) {
        let this = self.clone();
        tokio::spawn(async move {
            this.admission_loop().await;
        });
    }

    /// Stop admitting jobs and shut the worker pools down.
    pub async fn shutdown(&self) {
        self.cancellation_token.cancel();
        self.distributor.shutdown().await;
    }

    async fn admission_loop(self: Arc<Self>) {
        info!(
            ceiling = self.config.scheduler.max_concurrent_jobs,
            "Admission loop started"
        );

        loop {
            // Blocking admit: hold a ceiling permit before dequeuing, so the
            // number of active jobs can never overshoot.
            let permit = tokio::select! {
                _ = self.cancellation_token.cancelled() => break,
                permit = self.job_slots.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let job = tokio::select! {
                _ = self.cancellation_token.cancelled() => break,
                job = self.job_queue.dequeue() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            let job_id = job.job_id.clone();
            self.job_queue.mark_active(&job_id);
            let _ = self.event_tx.send(PipelineEvent::JobStarted {
                job_id: job_id.clone(),
            });

            let this = self.clone();
            tokio::spawn(async move {
                let outcome = this.process_job(&job).await;

                // Completion bookkeeping is unconditional: the active mark
                // and the admission permit are released whether the job
                // succeeded or not, and before anyone hears about the
                // outcome.
                this.job_queue.mark_complete(&job_id);
                drop(permit);

                match outcome {
                    Ok(()) => {
                        info!(job_id = %job_id, "Processed all frames for job");
                        let _ = this.event_tx.send(PipelineEvent::JobCompleted { job_id });
                    }
                    Err(e) => {
                        error!(job_id = %job_id, error = %e, "Video processing failed");
                        let _ = this.event_tx.send(PipelineEvent::JobFailed {
                            job_id,
                            error: e.to_string(),
                        });
                    }
                }
            });
        }

        info!("Admission loop stopped");
    }

    /// Process one admitted job to completion.
    async fn process_job(&self, job: &VideoJob) -> Result<()> {
        // Fail fast: every quality directory must check out before any
        // fan-out starts.
        let mut sources = Vec::with_capacity(job.quality_levels.len());
        for &quality in &job.quality_levels {
            sources
                .push(FrameSource::open(&self.config.storage.frames_root, &job.job_id, quality).await?);
        }
        info!(
            job_id = %job.job_id,
            qualities = sources.len(),
            "Fetched decoded frames for job"
        );

        let fps = job.fps();
        let capacity = self.config.scheduler.frame_channel_capacity;
        let mut fan_out = JoinSet::new();

        for source in sources {
            let distributor = self.distributor.clone();
            let store = self.store.clone();
            let job_id = job.job_id.clone();
            let pipeline_config = job.pipeline_config.clone();

            fan_out.spawn(async move {
                process_quality_stream(distributor, store, job_id, pipeline_config, fps, source, capacity)
                    .await
            });
        }

        // Join barrier: completion bookkeeping waits for every quality
        // stream, success or not.
        let mut first_error: Option<Error> = None;
        while let Some(joined) = fan_out.join_next().await {
            match joined {
                Ok(Ok(quality)) => {
                    info!(job_id = %job.job_id, quality = %quality, "Quality stream processed");
                }
                Ok(Err(e)) => {
                    error!(job_id = %job.job_id, error = %e, "Quality stream failed");
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    error!(job_id = %job.job_id, error = %e, "Fan-out task panicked");
                    first_error.get_or_insert(Error::other(format!("fan-out task failed: {e}")));
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        if job.wants(CapabilityKind::Enhance) {
            info!(
                job_id = %job.job_id,
                "Completed enhancement processing for all frames"
            );
            self.encoder.notify_complete(&job.job_id, &job.metadata).await;
        }
        if job.wants(CapabilityKind::RecognizeFaces) {
            info!(
                job_id = %job.job_id,
                "Completed facial recognition for all frames"
            );
        }

        Ok(())
    }
}

/// Consume one quality's frame stream in order: metadata, dispatch, persist.
async fn process_quality_stream(
    distributor: Arc<Distributor>,
    store: Arc<FrameStore>,
    job_id: String,
    pipeline_config: Vec<CapabilityKind>,
    fps: f64,
    source: FrameSource,
    capacity: usize,
) -> Result<Quality> {
    let quality = source.quality();
    let mut frames = source.stream(capacity);
    let mut frame_number: u64 = 0;

    while let Some(frame) = frames.recv().await {
        let frame = frame?;
        let metadata = FrameMetadata::compute(&frame, &job_id, frame_number, fps);
        let results = distributor
            .distribute(&frame, &metadata, &pipeline_config)
            .await;
        store.save(&frame, &metadata, &results).await?;
        frame_number += 1;
    }

    Ok(quality)
}
