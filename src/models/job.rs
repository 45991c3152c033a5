use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::models::plan::ScenePlan;
use crate::models::validation::ValidationResult;

/// Status of an animation job as it moves through the pipeline.
///
/// Transitions are linear (queued → planning → generating → validating →
/// rendering → completed); `failed` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Planning,
    Generating,
    Validating,
    Rendering,
    Completed,
    Failed,
}

impl JobStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether a write moving this status to `next` is legal.
    ///
    /// The store calls this on every status update, so callers cannot force
    /// an out-of-order transition.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;

        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Failed) => true,
            (Queued, Planning)
            | (Planning, Generating)
            | (Generating, Validating)
            | (Validating, Rendering)
            | (Rendering, Completed) => true,
            _ => false,
        }
    }
}

/// The four pipeline stages, as they appear in agent logs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentStage {
    Planner,
    Generator,
    Validator,
    Orchestrator,
}

/// Per-entry status of an agent log line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Waiting,
    Active,
    Completed,
    Failed,
}

/// One observable pipeline event, appended to the owning job in emission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLog {
    pub agent: AgentStage,
    pub status: LogStatus,
    pub message: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Stage artifact attached for UI consumption, when the stage produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl AgentLog {
    fn entry(agent: AgentStage, status: LogStatus, message: impl Into<String>) -> Self {
        Self {
            agent,
            status,
            message: message.into(),
            timestamp: Utc::now().timestamp_millis(),
            data: None,
        }
    }

    pub fn active(agent: AgentStage, message: impl Into<String>) -> Self {
        Self::entry(agent, LogStatus::Active, message)
    }

    pub fn completed(agent: AgentStage, message: impl Into<String>) -> Self {
        Self::entry(agent, LogStatus::Completed, message)
    }

    pub fn completed_with_data(
        agent: AgentStage,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            data: Some(data),
            ..Self::entry(agent, LogStatus::Completed, message)
        }
    }

    pub fn failed(agent: AgentStage, message: impl Into<String>) -> Self {
        Self::entry(agent, LogStatus::Failed, message)
    }
}

/// An animation job record. Serializes directly as the wire representation
/// returned by the job API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationJob {
    pub id: Uuid,
    pub prompt: String,
    pub status: JobStatus,
    pub scene_plan: Option<ScenePlan>,
    pub generated_code: Option<String>,
    pub validation_result: Option<ValidationResult>,
    pub video_url: Option<String>,
    pub error_message: Option<String>,
    pub agent_logs: Vec<AgentLog>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnimationJob {
    /// A fresh job: queued, no artifacts, no logs.
    pub fn new(prompt: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt,
            status: JobStatus::Queued,
            scene_plan: None,
            generated_code: None,
            validation_result: None,
            video_url: None,
            error_message: None,
            agent_logs: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_transitions_allowed() {
        use JobStatus::*;
        let order = [Queued, Planning, Generating, Validating, Rendering, Completed];
        for pair in order.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_skipping_stages_rejected() {
        use JobStatus::*;
        assert!(!Queued.can_transition_to(Generating));
        assert!(!Planning.can_transition_to(Rendering));
        assert!(!Queued.can_transition_to(Completed));
        assert!(!Rendering.can_transition_to(Planning));
    }

    #[test]
    fn test_failed_reachable_from_any_non_terminal() {
        use JobStatus::*;
        for status in [Queued, Planning, Generating, Validating, Rendering] {
            assert!(status.can_transition_to(Failed));
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        use JobStatus::*;
        for terminal in [Completed, Failed] {
            for next in [Queued, Planning, Generating, Validating, Rendering, Completed, Failed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Queued).unwrap(),
            "\"queued\""
        );
        assert_eq!(
            serde_json::to_string(&AgentStage::Orchestrator).unwrap(),
            "\"orchestrator\""
        );
        assert_eq!(
            serde_json::to_string(&LogStatus::Active).unwrap(),
            "\"active\""
        );
    }

    #[test]
    fn test_new_job_is_queued_and_empty() {
        let job = AnimationJob::new("Animate the unit circle".to_string());
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.scene_plan.is_none());
        assert!(job.generated_code.is_none());
        assert!(job.validation_result.is_none());
        assert!(job.video_url.is_none());
        assert!(job.error_message.is_none());
        assert!(job.agent_logs.is_empty());
        assert!(job.completed_at.is_none());
    }
}
