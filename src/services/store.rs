use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::job::{AgentLog, AnimationJob, JobStatus};
use crate::models::plan::ScenePlan;
use crate::models::validation::ValidationResult;

/// Partial update applied to a job record. `None` fields are left untouched.
#[derive(Debug, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub scene_plan: Option<ScenePlan>,
    pub generated_code: Option<String>,
    pub validation_result: Option<ValidationResult>,
    pub video_url: Option<String>,
    pub error_message: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Terminal failure write: status, cause and completion time in one update.
    pub fn failed(message: String) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error_message: Some(message),
            completed_at: Some(Utc::now()),
            ..Self::default()
        }
    }
}

/// In-memory job store. Every operation takes a single lock guard, so
/// concurrent `update`/`append_log` calls for the same job interleave without
/// losing writes; log appends are never dropped.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, AnimationJob>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queued job with no artifacts and no logs.
    pub async fn create(&self, prompt: String) -> AnimationJob {
        let job = AnimationJob::new(prompt);
        self.jobs.write().await.insert(job.id, job.clone());
        job
    }

    pub async fn get(&self, id: Uuid) -> Option<AnimationJob> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// All jobs, in unspecified order. Callers sort.
    pub async fn list(&self) -> Vec<AnimationJob> {
        self.jobs.read().await.values().cloned().collect()
    }

    pub async fn delete(&self, id: Uuid) -> bool {
        self.jobs.write().await.remove(&id).is_some()
    }

    /// Merge `update` into the job record.
    ///
    /// Status writes are checked against the state machine; any write to a job
    /// already in a terminal state is rejected, which keeps `completed_at`
    /// single-assignment and freezes artifacts after the terminal commit.
    pub async fn update(&self, id: Uuid, update: JobUpdate) -> Result<AnimationJob, StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if job.status.is_terminal() {
            return Err(StoreError::Terminal(id));
        }
        if let Some(next) = update.status {
            if !job.status.can_transition_to(next) {
                return Err(StoreError::InvalidTransition {
                    from: job.status,
                    to: next,
                });
            }
            job.status = next;
        }
        if let Some(plan) = update.scene_plan {
            job.scene_plan = Some(plan);
        }
        if let Some(code) = update.generated_code {
            job.generated_code = Some(code);
        }
        if let Some(result) = update.validation_result {
            job.validation_result = Some(result);
        }
        if let Some(url) = update.video_url {
            job.video_url = Some(url);
        }
        if let Some(message) = update.error_message {
            job.error_message = Some(message);
        }
        if let Some(at) = update.completed_at {
            job.completed_at = Some(at);
        }

        Ok(job.clone())
    }

    /// Append a log entry in emission order. No-op when the job is absent
    /// (e.g. deleted while its pipeline is still running).
    pub async fn append_log(&self, id: Uuid, log: AgentLog) {
        if let Some(job) = self.jobs.write().await.get_mut(&id) {
            job.agent_logs.push(log);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("job {0} already reached a terminal state")]
    Terminal(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::AgentStage;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = JobStore::new();
        let job = store.create("Animate a bouncing ball slowing down".to_string()).await;

        let fetched = store.get(job.id).await.unwrap();
        assert_eq!(fetched.id, job.id);
        assert_eq!(fetched.status, JobStatus::Queued);
        assert!(fetched.agent_logs.is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = JobStore::new();
        let job = store.create("Animate a pendulum with energy labels".to_string()).await;

        store
            .update(job.id, JobUpdate::status(JobStatus::Planning))
            .await
            .unwrap();
        let updated = store
            .update(
                job.id,
                JobUpdate {
                    generated_code: Some("from manim import *".to_string()),
                    ..JobUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, JobStatus::Planning);
        assert_eq!(updated.generated_code.as_deref(), Some("from manim import *"));
        // untouched fields survive the merge
        assert_eq!(updated.prompt, job.prompt);
    }

    #[tokio::test]
    async fn test_out_of_order_transition_rejected() {
        let store = JobStore::new();
        let job = store.create("Animate the water cycle step by step".to_string()).await;

        let err = store
            .update(job.id, JobUpdate::status(JobStatus::Rendering))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        // record unchanged
        assert_eq!(store.get(job.id).await.unwrap().status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn test_terminal_job_is_frozen() {
        let store = JobStore::new();
        let job = store.create("Animate binary search on a sorted array".to_string()).await;

        store
            .update(job.id, JobUpdate::failed("planner exploded".to_string()))
            .await
            .unwrap();

        let err = store
            .update(
                job.id,
                JobUpdate {
                    video_url: Some("https://example.com/v.mp4".to_string()),
                    ..JobUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Terminal(_)));

        let frozen = store.get(job.id).await.unwrap();
        assert!(frozen.video_url.is_none());
        assert!(frozen.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_update_missing_job_is_not_found() {
        let store = JobStore::new();
        let err = store
            .update(Uuid::new_v4(), JobUpdate::status(JobStatus::Planning))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_append_log_to_missing_job_is_noop() {
        let store = JobStore::new();
        store
            .append_log(Uuid::new_v4(), AgentLog::active(AgentStage::Planner, "x"))
            .await;
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = JobStore::new();
        let job = store.create("Animate photosynthesis inputs and outputs".to_string()).await;

        assert!(store.delete(job.id).await);
        assert!(store.get(job.id).await.is_none());
        assert!(!store.delete(job.id).await);
    }

    #[tokio::test]
    async fn test_interleaved_appends_and_updates_lose_nothing() {
        let store = Arc::new(JobStore::new());
        let job = store.create("Animate sorting networks comparing wires".to_string()).await;

        let mut tasks = Vec::new();
        for i in 0..50 {
            let store = Arc::clone(&store);
            let id = job.id;
            tasks.push(tokio::spawn(async move {
                store
                    .append_log(id, AgentLog::active(AgentStage::Planner, format!("step {i}")))
                    .await;
            }));
        }
        {
            let store = Arc::clone(&store);
            let id = job.id;
            tasks.push(tokio::spawn(async move {
                store.update(id, JobUpdate::status(JobStatus::Planning)).await.unwrap();
            }));
        }
        futures::future::join_all(tasks).await;

        let job = store.get(job.id).await.unwrap();
        assert_eq!(job.agent_logs.len(), 50);
        assert_eq!(job.status, JobStatus::Planning);
    }
}
