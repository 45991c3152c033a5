use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::job::{AgentLog, JobStatus};
use crate::models::plan::ScenePlan;
use crate::models::validation::ValidationResult;
use crate::services::agents;
use crate::services::agents::AgentError;
use crate::services::generation::GenerationClient;
use crate::services::render::RenderBackend;
use crate::services::retry::RetryPolicy;
use crate::services::store::{JobStore, JobUpdate, StoreError};

/// Artifact produced by one pipeline stage, persisted before the next stage
/// starts.
#[derive(Debug, Clone)]
pub enum StageArtifact {
    ScenePlan(ScenePlan),
    GeneratedCode(String),
    ValidationResult(ValidationResult),
}

/// Where the pipeline streams incremental state: log entries, status
/// transitions and intermediate artifacts.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn append_log(&self, log: AgentLog);
    async fn set_status(&self, status: JobStatus);
    async fn save_artifact(&self, artifact: StageArtifact);
}

/// Sink writing into the job store for one job id.
///
/// A job deleted while its pipeline is still running makes every subsequent
/// write a no-op; the background task finishes quietly.
pub struct StoreSink {
    store: Arc<JobStore>,
    job_id: Uuid,
}

impl StoreSink {
    pub fn new(store: Arc<JobStore>, job_id: Uuid) -> Self {
        Self { store, job_id }
    }

    async fn apply(&self, update: JobUpdate) {
        match self.store.update(self.job_id, update).await {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(job_id = %self.job_id, "job removed mid-pipeline, dropping write");
            }
            Err(err) => {
                tracing::warn!(job_id = %self.job_id, error = %err, "pipeline write rejected");
            }
        }
    }
}

#[async_trait]
impl ProgressSink for StoreSink {
    async fn append_log(&self, log: AgentLog) {
        self.store.append_log(self.job_id, log).await;
    }

    async fn set_status(&self, status: JobStatus) {
        self.apply(JobUpdate::status(status)).await;
    }

    async fn save_artifact(&self, artifact: StageArtifact) {
        let update = match artifact {
            StageArtifact::ScenePlan(plan) => JobUpdate {
                scene_plan: Some(plan),
                ..JobUpdate::default()
            },
            StageArtifact::GeneratedCode(code) => JobUpdate {
                generated_code: Some(code),
                ..JobUpdate::default()
            },
            StageArtifact::ValidationResult(result) => JobUpdate {
                validation_result: Some(result),
                ..JobUpdate::default()
            },
        };
        self.apply(update).await;
    }
}

/// Everything a fully successful pipeline run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub scene_plan: ScenePlan,
    pub generated_code: String,
    pub validation_result: ValidationResult,
    pub video_url: String,
}

/// Run the four stages in order. Each stage's artifact is persisted and the
/// status advanced before the next stage starts; the first failure stops the
/// pipeline and propagates. Terminal state is never written here; the caller
/// performs the single terminal commit.
pub async fn run_full_pipeline(
    prompt: &str,
    generation: &dyn GenerationClient,
    renderer: &dyn RenderBackend,
    retry: RetryPolicy,
    sink: &dyn ProgressSink,
) -> Result<PipelineOutcome, AgentError> {
    sink.set_status(JobStatus::Planning).await;
    let scene_plan = agents::run_scene_planner(generation, retry, sink, prompt).await?;
    sink.save_artifact(StageArtifact::ScenePlan(scene_plan.clone())).await;

    sink.set_status(JobStatus::Generating).await;
    let generated_code = agents::run_code_generator(generation, retry, sink, &scene_plan).await?;
    sink.save_artifact(StageArtifact::GeneratedCode(generated_code.clone())).await;

    sink.set_status(JobStatus::Validating).await;
    let validation_result =
        agents::run_validator(generation, retry, sink, &generated_code, &scene_plan).await?;
    sink.save_artifact(StageArtifact::ValidationResult(validation_result.clone())).await;

    sink.set_status(JobStatus::Rendering).await;
    let video_url = agents::run_renderer(renderer, sink, &generated_code).await?;

    Ok(PipelineOutcome {
        scene_plan,
        generated_code,
        validation_result,
        video_url,
    })
}

/// Body of the detached background task for one job: run the pipeline, then
/// commit the terminal state exactly once.
pub async fn execute_job(
    store: Arc<JobStore>,
    generation: Arc<dyn GenerationClient>,
    renderer: Arc<dyn RenderBackend>,
    retry: RetryPolicy,
    job_id: Uuid,
    prompt: String,
) {
    let started = Instant::now();
    let sink = StoreSink::new(Arc::clone(&store), job_id);

    match run_full_pipeline(&prompt, generation.as_ref(), renderer.as_ref(), retry, &sink).await {
        Ok(outcome) => {
            let commit = JobUpdate {
                status: Some(JobStatus::Completed),
                scene_plan: Some(outcome.scene_plan),
                generated_code: Some(outcome.generated_code),
                validation_result: Some(outcome.validation_result),
                video_url: Some(outcome.video_url),
                completed_at: Some(Utc::now()),
                ..JobUpdate::default()
            };
            match store.update(job_id, commit).await {
                Ok(_) => {
                    metrics::counter!("animation_jobs_completed").increment(1);
                    tracing::info!(
                        job_id = %job_id,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "pipeline completed"
                    );
                }
                Err(err) => {
                    tracing::warn!(job_id = %job_id, error = %err, "completion commit dropped");
                }
            }
        }
        Err(err) => {
            metrics::counter!("animation_jobs_failed").increment(1);
            tracing::error!(job_id = %job_id, error = %err, "pipeline failed");
            if let Err(commit_err) = store.update(job_id, JobUpdate::failed(err.to_string())).await
            {
                tracing::warn!(job_id = %job_id, error = %commit_err, "failure commit dropped");
            }
        }
    }

    metrics::histogram!("pipeline_duration_seconds").record(started.elapsed().as_secs_f64());
}

/// Unbounded set of detached pipeline tasks, keyed by job id. There is no
/// admission control and no cancellation of in-flight pipelines; finished
/// handles are pruned on the next spawn.
#[derive(Default)]
pub struct PipelineRunner {
    tasks: Mutex<HashMap<Uuid, JoinHandle<()>>>,
}

impl PipelineRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detach `pipeline` as a background task. The caller gets nothing back
    /// beyond "accepted".
    pub fn spawn(&self, job_id: Uuid, pipeline: impl Future<Output = ()> + Send + 'static) {
        let handle = tokio::spawn(pipeline);
        let mut tasks = self.tasks.lock().expect("pipeline task set lock poisoned");
        tasks.retain(|_, task| !task.is_finished());
        tasks.insert(job_id, handle);
    }

    /// Number of pipelines still running.
    pub fn active(&self) -> usize {
        self.tasks
            .lock()
            .expect("pipeline task set lock poisoned")
            .values()
            .filter(|task| !task.is_finished())
            .count()
    }
}
