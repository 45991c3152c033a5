use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

/// Sandboxed execution backend that turns animation code into a playable
/// video reference. The orchestrator stage only depends on this contract, so
/// a real sandbox can replace the stub without touching the coordinator.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    async fn render(&self, code: &str) -> Result<String, RenderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("sandbox execution failed: {0}")]
    Sandbox(String),
}

/// Stand-in renderer: waits out a simulated sandbox run and returns a fixed
/// sample video URL.
pub struct StubRenderer {
    video_url: String,
    delay: Duration,
}

const SAMPLE_VIDEO_URL: &str =
    "https://sample-videos.com/video321/mp4/720/big_buck_bunny_720p_1mb.mp4";

impl StubRenderer {
    pub fn new() -> Self {
        Self {
            video_url: SAMPLE_VIDEO_URL.to_string(),
            delay: Duration::from_millis(3500),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for StubRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RenderBackend for StubRenderer {
    async fn render(&self, _code: &str) -> Result<String, RenderError> {
        sleep(self.delay).await;
        Ok(self.video_url.clone())
    }
}
