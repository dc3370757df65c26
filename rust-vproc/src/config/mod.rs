//! Service configuration.
//!
//! Plain config structs with defaults matching the deployed service, each
//! overridable through environment variables at startup.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::encoder::EncoderConfig;
use crate::pipeline::{CapabilityKind, CapabilityPoolConfig};

/// Storage locations for frame input and processed output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the decoded-frame source tree
    /// (`<frames_root>/decoded_frames_{job_id}/quality_{label}/`).
    pub frames_root: PathBuf,
    /// Root of the processed output tree
    /// (`<output_root>/job_{id}/quality_{label}/`).
    pub output_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            frames_root: PathBuf::from("decoded_storage"),
            output_root: PathBuf::from("processed_frames"),
        }
    }
}

/// Job admission and fan-out tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of jobs processed concurrently.
    pub max_concurrent_jobs: usize,
    /// Capacity of the pending-job queue; submissions beyond it are rejected.
    pub queue_capacity: usize,
    /// Capacity of each per-quality frame channel.
    pub frame_channel_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 3,
            queue_capacity: 64,
            frame_channel_capacity: 100,
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub scheduler: SchedulerConfig,
    /// Enhancement worker pool.
    pub enhance_pool: CapabilityPoolConfig,
    /// Face-recognition worker pool.
    pub recognize_pool: CapabilityPoolConfig,
    pub encoder: EncoderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            scheduler: SchedulerConfig::default(),
            enhance_pool: CapabilityPoolConfig {
                workers: 5,
                ..Default::default()
            },
            recognize_pool: CapabilityPoolConfig {
                workers: 2,
                ..Default::default()
            },
            encoder: EncoderConfig::default(),
        }
    }
}

impl AppConfig {
    /// Pool configuration for one capability.
    pub fn pool_config(&self, kind: CapabilityKind) -> CapabilityPoolConfig {
        match kind {
            CapabilityKind::Enhance => self.enhance_pool.clone(),
            CapabilityKind::RecognizeFaces => self.recognize_pool.clone(),
        }
    }

    /// Load configuration from environment variables, falling back to
    /// defaults.
    ///
    /// Supported env vars:
    /// - `VPROC_FRAMES_ROOT` / `VPROC_OUTPUT_ROOT`
    /// - `VPROC_MAX_CONCURRENT_JOBS`
    /// - `VPROC_ENHANCE_WORKERS` / `VPROC_RECOGNIZE_WORKERS`
    /// - `VPROC_ENCODER_URL`
    pub fn from_env_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(root) = std::env::var("VPROC_FRAMES_ROOT")
            && !root.trim().is_empty()
        {
            config.storage.frames_root = PathBuf::from(root);
        }

        if let Ok(root) = std::env::var("VPROC_OUTPUT_ROOT")
            && !root.trim().is_empty()
        {
            config.storage.output_root = PathBuf::from(root);
        }

        if let Ok(value) = std::env::var("VPROC_MAX_CONCURRENT_JOBS")
            && let Ok(parsed) = value.parse::<usize>()
            && parsed > 0
        {
            config.scheduler.max_concurrent_jobs = parsed;
        }

        if let Ok(value) = std::env::var("VPROC_ENHANCE_WORKERS")
            && let Ok(parsed) = value.parse::<usize>()
            && parsed > 0
        {
            config.enhance_pool.workers = parsed;
        }

        if let Ok(value) = std::env::var("VPROC_RECOGNIZE_WORKERS")
            && let Ok(parsed) = value.parse::<usize>()
            && parsed > 0
        {
            config.recognize_pool.workers = parsed;
        }

        if let Ok(url) = std::env::var("VPROC_ENCODER_URL")
            && !url.trim().is_empty()
        {
            config.encoder.url = url;
        }

        config
    }
}
