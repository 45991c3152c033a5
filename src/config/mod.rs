use std::time::Duration;

use serde::Deserialize;

use crate::services::retry::RetryPolicy;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Gemini API key. Optional: startup succeeds without it, but every
    /// generation call then fails with a missing-credential error.
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    /// Gemini model identifier.
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Gemini API base URL (overridable for testing).
    #[serde(default = "default_gemini_api_base")]
    pub gemini_api_base: String,

    /// Attempt limit for calls to the generation capability.
    #[serde(default = "default_generation_max_attempts")]
    pub generation_max_attempts: u32,

    /// Base backoff delay in milliseconds; doubles per attempt.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_generation_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.generation_max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}
