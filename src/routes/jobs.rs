use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::CreateJobRequest;
use crate::models::job::AnimationJob;
use crate::routes::ApiError;
use crate::services::pipeline;

/// POST /api/jobs — create a job and launch its pipeline in the background.
///
/// The response is the queued snapshot taken before the pipeline writes
/// anything, so callers always observe `queued` with empty logs here.
pub async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<AnimationJob>), ApiError> {
    request
        .validate()
        .map_err(|report| ApiError::InvalidRequest(format!("invalid request: {report}")))?;

    let job = state.store.create(request.prompt.clone()).await;
    metrics::counter!("animation_jobs_total").increment(1);
    tracing::info!(job_id = %job.id, "animation job accepted");

    state.runner.spawn(
        job.id,
        pipeline::execute_job(
            state.store.clone(),
            state.generation.clone(),
            state.renderer.clone(),
            state.retry,
            job.id,
            request.prompt,
        ),
    );

    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/jobs — all jobs, in unspecified order.
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<AnimationJob>> {
    Json(state.store.list().await)
}

/// GET /api/jobs/{id} — current state of one job.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnimationJob>, ApiError> {
    state
        .store
        .get(id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// DELETE /api/jobs/{id} — remove the job record. A pipeline still running
/// for this id keeps going; its remaining writes land nowhere.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete(id).await {
        tracing::info!(job_id = %id, "animation job deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
