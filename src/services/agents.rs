use garde::Validate;

use crate::models::job::{AgentLog, AgentStage};
use crate::models::plan::ScenePlan;
use crate::models::validation::ValidationResult;
use crate::services::generation::{GenerationClient, GenerationError, GenerationRequest};
use crate::services::pipeline::ProgressSink;
use crate::services::render::{RenderBackend, RenderError};
use crate::services::retry::{retry_with_backoff, RetryPolicy};

/// Failure of a single pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("generation request failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("empty response from {0}")]
    EmptyResponse(AgentStage),

    #[error("malformed {stage} output: {reason}")]
    MalformedOutput { stage: AgentStage, reason: String },

    #[error("rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// Only overloaded/unavailable generation failures are worth retrying;
    /// parse failures and renderer errors are permanent.
    pub fn is_transient(&self) -> bool {
        matches!(self, AgentError::Generation(err) if err.is_transient())
    }
}

const PLANNER_INSTRUCTION: &str = r#"You are an expert educational animation planner.
Analyze the user's request and create a detailed scene plan for a Manim animation.
Break down the animation into logical scenes with timing, visual elements, and animations.

Respond with JSON in this exact format:
{
  "title": "Animation title",
  "description": "Brief description of the animation",
  "duration": 10,
  "scenes": [
    {
      "name": "Scene name",
      "description": "What happens in this scene",
      "startTime": 0,
      "endTime": 3,
      "elements": [
        {
          "type": "text|shape|equation|graph|arrow",
          "description": "Description of the element",
          "properties": {}
        }
      ],
      "animations": [
        {
          "type": "FadeIn|Write|Create|Transform|MoveToTarget",
          "target": "element reference",
          "duration": 1,
          "description": "What the animation does"
        }
      ]
    }
  ]
}"#;

const GENERATOR_INSTRUCTION: &str = r#"You are an expert Manim animation programmer.
Convert the given scene plan into valid Manim Community Edition Python code.
Follow these guidelines:
- Use proper Manim imports (from manim import *)
- Create a class that inherits from Scene
- Use construct(self) method for the animation
- Include proper timing with self.wait() calls
- Use appropriate Manim objects (Text, MathTex, Circle, Square, Arrow, etc.)
- Apply animations like FadeIn, Write, Create, Transform, etc.
- Add comments explaining each section
- Make the code educational and clear

Return ONLY the Python code, no markdown formatting or explanations."#;

const VALIDATOR_INSTRUCTION: &str = r#"You are an expert Manim code reviewer and educator.
Review the given Manim Python code for:
1. Syntax errors and potential runtime issues
2. Proper use of the Manim library
3. Educational effectiveness and clarity
4. Best practices for animation pedagogy

Respond with JSON in this exact format:
{
  "isValid": true/false,
  "errors": [
    {
      "line": 10,
      "message": "Error description",
      "severity": "error|warning|info"
    }
  ],
  "suggestions": [
    "Improvement suggestion 1",
    "Improvement suggestion 2"
  ],
  "educationalScore": 85
}

The educationalScore should be 0-100 based on how well the animation teaches the concept."#;

/// Planning stage: prompt → scene plan.
pub async fn run_scene_planner(
    generation: &dyn GenerationClient,
    retry: RetryPolicy,
    sink: &dyn ProgressSink,
    prompt: &str,
) -> Result<ScenePlan, AgentError> {
    sink.append_log(AgentLog::active(
        AgentStage::Planner,
        "Analyzing prompt and creating scene blueprint...",
    ))
    .await;

    let outcome = retry_with_backoff(retry, AgentError::is_transient, || async move {
        let response = generation
            .generate(GenerationRequest {
                system_instruction: PLANNER_INSTRUCTION.to_string(),
                payload: prompt.to_string(),
                expect_structured_output: true,
            })
            .await?;

        if response.text.trim().is_empty() {
            return Err(AgentError::EmptyResponse(AgentStage::Planner));
        }
        serde_json::from_str::<ScenePlan>(&response.text).map_err(|err| {
            AgentError::MalformedOutput {
                stage: AgentStage::Planner,
                reason: err.to_string(),
            }
        })
    })
    .await;

    match outcome {
        Ok(plan) => {
            sink.append_log(AgentLog::completed_with_data(
                AgentStage::Planner,
                format!("Created plan with {} scenes", plan.scenes.len()),
                serde_json::to_value(&plan)?,
            ))
            .await;
            Ok(plan)
        }
        Err(err) => {
            sink.append_log(AgentLog::failed(
                AgentStage::Planner,
                format!("Planning failed: {err}"),
            ))
            .await;
            Err(err)
        }
    }
}

/// Generation stage: scene plan → Manim Python source.
pub async fn run_code_generator(
    generation: &dyn GenerationClient,
    retry: RetryPolicy,
    sink: &dyn ProgressSink,
    plan: &ScenePlan,
) -> Result<String, AgentError> {
    sink.append_log(AgentLog::active(
        AgentStage::Generator,
        "Converting scene plan to Manim Python code...",
    ))
    .await;

    let plan_json = serde_json::to_string_pretty(plan)?;
    let payload = format!("Create Manim code for this animation plan:\n{plan_json}");
    let payload = payload.as_str();

    let outcome = retry_with_backoff(retry, AgentError::is_transient, || async move {
        let response = generation
            .generate(GenerationRequest {
                system_instruction: GENERATOR_INSTRUCTION.to_string(),
                payload: payload.to_string(),
                expect_structured_output: false,
            })
            .await?;

        let code = strip_code_fences(&response.text);
        if code.is_empty() {
            return Err(AgentError::EmptyResponse(AgentStage::Generator));
        }
        Ok(code)
    })
    .await;

    match outcome {
        Ok(code) => {
            sink.append_log(AgentLog::completed(
                AgentStage::Generator,
                format!("Generated {} lines of Manim code", code.lines().count()),
            ))
            .await;
            Ok(code)
        }
        Err(err) => {
            sink.append_log(AgentLog::failed(
                AgentStage::Generator,
                format!("Code generation failed: {err}"),
            ))
            .await;
            Err(err)
        }
    }
}

/// Validation stage: (code, plan) → structured review.
pub async fn run_validator(
    generation: &dyn GenerationClient,
    retry: RetryPolicy,
    sink: &dyn ProgressSink,
    code: &str,
    plan: &ScenePlan,
) -> Result<ValidationResult, AgentError> {
    sink.append_log(AgentLog::active(
        AgentStage::Validator,
        "Validating code for errors and best practices...",
    ))
    .await;

    let plan_json = serde_json::to_string(plan)?;
    let payload = format!("Review this Manim code:\n\n{code}\n\nOriginal plan: {plan_json}");
    let payload = payload.as_str();

    let outcome = retry_with_backoff(retry, AgentError::is_transient, || async move {
        let response = generation
            .generate(GenerationRequest {
                system_instruction: VALIDATOR_INSTRUCTION.to_string(),
                payload: payload.to_string(),
                expect_structured_output: true,
            })
            .await?;

        if response.text.trim().is_empty() {
            return Err(AgentError::EmptyResponse(AgentStage::Validator));
        }
        let result = serde_json::from_str::<ValidationResult>(&response.text).map_err(|err| {
            AgentError::MalformedOutput {
                stage: AgentStage::Validator,
                reason: err.to_string(),
            }
        })?;
        // contract shape only: the score must be in range, nothing more
        result.validate().map_err(|report| AgentError::MalformedOutput {
            stage: AgentStage::Validator,
            reason: report.to_string(),
        })?;
        Ok(result)
    })
    .await;

    match outcome {
        Ok(result) => {
            sink.append_log(AgentLog::completed_with_data(
                AgentStage::Validator,
                format!("Validation complete. Score: {}/100", result.educational_score),
                serde_json::to_value(&result)?,
            ))
            .await;
            Ok(result)
        }
        Err(err) => {
            sink.append_log(AgentLog::failed(
                AgentStage::Validator,
                format!("Validation failed: {err}"),
            ))
            .await;
            Err(err)
        }
    }
}

/// Rendering stage: code → playable video reference, via the sandbox backend.
pub async fn run_renderer(
    renderer: &dyn RenderBackend,
    sink: &dyn ProgressSink,
    code: &str,
) -> Result<String, AgentError> {
    sink.append_log(AgentLog::active(
        AgentStage::Orchestrator,
        "Preparing sandboxed execution environment...",
    ))
    .await;
    sink.append_log(AgentLog::active(
        AgentStage::Orchestrator,
        "Executing Manim script in sandbox...",
    ))
    .await;

    match renderer.render(code).await {
        Ok(video_url) => {
            sink.append_log(AgentLog::completed(
                AgentStage::Orchestrator,
                "Rendering complete. Video ready for download.",
            ))
            .await;
            Ok(video_url)
        }
        Err(err) => {
            let failure = AgentError::from(err);
            sink.append_log(AgentLog::failed(
                AgentStage::Orchestrator,
                format!("Rendering failed: {failure}"),
            ))
            .await;
            Err(failure)
        }
    }
}

/// Drop surrounding Markdown code-fence markup, with or without a language
/// tag, leaving the enclosed source untouched.
fn strip_code_fences(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
    }
    let trimmed = text.trim_end();
    if let Some(rest) = trimmed.strip_suffix("```") {
        text = rest;
    }

    text.trim().to_string()
}
