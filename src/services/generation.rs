use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::AppConfig;

/// One request to the generation capability.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Stage-specific instruction template.
    pub system_instruction: String,
    /// The content the stage wants processed (prompt, plan JSON, code).
    pub payload: String,
    /// Ask the capability for a raw JSON document instead of prose.
    pub expect_structured_output: bool,
}

#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub text: String,
}

/// Opaque "generate structured content from a prompt" capability.
///
/// Constructed once at startup and injected into the stage executors, so
/// tests can substitute a scripted fake.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, request: GenerationRequest)
        -> Result<GenerationResponse, GenerationError>;
}

/// Client for the Gemini `generateContent` REST API.
pub struct GeminiClient {
    http: Client,
    api_base: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// A missing API key is not a construction error; every `generate` call
    /// will fail with `MissingCredential` instead, so startup never crashes
    /// on an unconfigured environment.
    pub fn new(config: &AppConfig) -> Result<Self, GenerationError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(GenerationError::Http)?;

        Ok(Self {
            http,
            api_base: config.gemini_api_base.clone(),
            model: config.gemini_model.clone(),
            api_key: config.gemini_api_key.clone(),
        })
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or(GenerationError::MissingCredential)?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );

        let mut body = serde_json::json!({
            "systemInstruction": { "parts": [{ "text": request.system_instruction }] },
            "contents": [{ "parts": [{ "text": request.payload }] }],
        });
        if request.expect_structured_output {
            body["generationConfig"] = serde_json::json!({
                "responseMimeType": "application/json"
            });
        }

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(GenerationError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(GenerationError::Http)?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|err| GenerationError::Malformed(err.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        Ok(GenerationResponse { text })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation credential is not configured (set GEMINI_API_KEY)")]
    MissingCredential,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("malformed generation response: {0}")]
    Malformed(String),
}

impl GenerationError {
    /// Transient failures are identified by the server-overload signatures in
    /// the error text; everything else is permanent.
    pub fn is_transient(&self) -> bool {
        let message = self.to_string();
        message.contains("503") || message.contains("overloaded") || message.contains("UNAVAILABLE")
    }
}
