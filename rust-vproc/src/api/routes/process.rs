//! Job submission routes.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | POST | `/api/process` | Queue a video processing job |

use axum::{Json, Router, extract::State, routing::post};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::ProcessResponse;
use crate::api::server::AppState;
use crate::pipeline::VideoJob;

/// Create the process router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(submit_job))
}

/// Queue a video processing job.
///
/// # Endpoint
///
/// `POST /api/process`
///
/// # Request Body
///
/// ```json
/// {
///     "job_id": "j1",
///     "metadata": {"fps": 30},
///     "quality_levels": ["1280x720"],
///     "priority": "normal",
///     "pipeline_config": ["enhance", "recognize_faces"]
/// }
/// ```
///
/// `job_id` is taken as-is; uniqueness is the caller's responsibility.
/// Responds with the job's queue position, or 503 when the queue is full.
async fn submit_job(
    State(state): State<AppState>,
    Json(job): Json<VideoJob>,
) -> ApiResult<Json<ProcessResponse>> {
    let job_id = job.job_id.clone();
    let position = state.processor.submit(job).map_err(ApiError::from)?;

    Ok(Json(ProcessResponse {
        message: "Video job queued".to_string(),
        job_id,
        position,
    }))
}
