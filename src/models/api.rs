use garde::Validate;
use serde::{Deserialize, Serialize};

/// Request to create an animation job. A missing prompt deserializes to the
/// empty string and is rejected by the length check like any short prompt.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateJobRequest {
    #[serde(default)]
    #[garde(length(min = 10, max = 4000))]
    pub prompt: String,
}

/// JSON error body returned by all failing API routes.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
