//! API request and response models.

use serde::{Deserialize, Serialize};

/// Response for an accepted job submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResponse {
    /// Human-readable acceptance message.
    pub message: String,
    /// The submitted job id, echoed back.
    pub job_id: String,
    /// Queue depth after the insert.
    pub position: usize,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}
