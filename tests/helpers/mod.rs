//! Test helper utilities shared by the integration tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use animagen::app_state::AppState;
use animagen::routes;
use animagen::services::generation::{
    GenerationClient, GenerationError, GenerationRequest, GenerationResponse,
};
use animagen::services::render::StubRenderer;
use animagen::services::retry::RetryPolicy;
use animagen::services::store::JobStore;

/// Generation client that replays a fixed script of outcomes, one per call.
pub struct ScriptedClient {
    responses: Mutex<Vec<Result<String, GenerationError>>>,
    calls: AtomicU32,
}

impl ScriptedClient {
    pub fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(
        &self,
        _request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        assert!(!responses.is_empty(), "scripted client ran out of responses");
        responses.remove(0).map(|text| GenerationResponse { text })
    }
}

/// Canned planner output.
pub fn plan_json() -> String {
    serde_json::json!({
        "title": "Pythagorean Theorem",
        "description": "Colored squares on the sides of a right triangle",
        "duration": 12,
        "scenes": [{
            "name": "Construction",
            "description": "Draw the triangle and the three squares",
            "startTime": 0,
            "endTime": 6,
            "elements": [
                {"type": "shape", "description": "right triangle", "properties": {"color": "white"}},
                {"type": "equation", "description": "a^2 + b^2 = c^2"}
            ],
            "animations": [
                {"type": "Create", "target": "right triangle", "duration": 2,
                 "description": "draw the triangle edge by edge"}
            ]
        }]
    })
    .to_string()
}

/// Canned generator output, wrapped in a code fence like real model output.
pub fn code_response() -> String {
    "```python\nfrom manim import *\n\nclass PythagoreanScene(Scene):\n    def construct(self):\n        self.wait(1)\n```"
        .to_string()
}

/// Canned validator output.
pub fn validation_json() -> String {
    serde_json::json!({
        "isValid": true,
        "errors": [],
        "suggestions": ["Slow down the final transform"],
        "educationalScore": 88
    })
    .to_string()
}

/// The three generation responses of a fully successful pipeline, in stage
/// order (the renderer stage does not call the generation capability).
pub fn happy_path_script() -> Vec<Result<String, GenerationError>> {
    vec![Ok(plan_json()), Ok(code_response()), Ok(validation_json())]
}

fn permanent_error() -> GenerationError {
    GenerationError::Api {
        status: 400,
        body: "bad request".to_string(),
    }
}

/// Script where stage `k` (0-based) fails permanently.
pub fn failing_at_stage_script(k: usize) -> Vec<Result<String, GenerationError>> {
    happy_path_script()
        .into_iter()
        .enumerate()
        .map(|(i, response)| if i == k { Err(permanent_error()) } else { response })
        .take(k + 1)
        .collect()
}

/// Application state wired with the scripted client, an instant renderer and
/// millisecond backoff.
pub fn test_state(client: Arc<ScriptedClient>) -> AppState {
    AppState::new(
        JobStore::new(),
        client,
        Arc::new(StubRenderer::new().with_delay(Duration::ZERO)),
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        },
        true,
    )
}

/// Serve the real router on an ephemeral port; returns the base URL.
pub async fn spawn_server(state: AppState) -> String {
    let app = routes::api_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server error");
    });

    format!("http://{addr}")
}

/// Poll job status until completed or failed (with timeout).
pub async fn poll_until_terminal(
    client: &reqwest::Client,
    base_url: &str,
    job_id: &str,
    timeout: Duration,
) -> serde_json::Value {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let response = client
            .get(format!("{base_url}/api/jobs/{job_id}"))
            .send()
            .await
            .expect("status poll failed");
        assert!(response.status().is_success());

        let job: serde_json::Value = response.json().await.expect("invalid job body");
        match job["status"].as_str() {
            Some("completed") | Some("failed") => return job,
            Some(_) => {
                assert!(
                    tokio::time::Instant::now() < deadline,
                    "job {job_id} did not reach a terminal state in time"
                );
                sleep(Duration::from_millis(10)).await;
            }
            None => panic!("job body missing status: {job}"),
        }
    }
}
