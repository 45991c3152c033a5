use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub generation: ComponentHealth,
    pub jobs: JobsHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
}

#[derive(Serialize)]
pub struct JobsHealth {
    pub stored: usize,
    pub running_pipelines: usize,
}

/// GET /health — service status plus collaborator checks.
///
/// A missing generation credential does not degrade liveness; it is reported
/// so operators can see why every job would fail.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let generation = ComponentHealth {
        status: if state.generation_configured {
            "configured".to_string()
        } else {
            "missing credential".to_string()
        },
    };

    let jobs = JobsHealth {
        stored: state.store.list().await.len(),
        running_pipelines: state.runner.active(),
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks { generation, jobs },
    })
}
