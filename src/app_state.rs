use std::sync::Arc;

use crate::services::generation::GenerationClient;
use crate::services::pipeline::PipelineRunner;
use crate::services::render::RenderBackend;
use crate::services::retry::RetryPolicy;
use crate::services::store::JobStore;

/// Shared application state passed to all route handlers.
///
/// The generation client and render backend are trait objects constructed
/// once at startup and injected everywhere, so tests swap in fakes.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JobStore>,
    pub generation: Arc<dyn GenerationClient>,
    pub renderer: Arc<dyn RenderBackend>,
    pub runner: Arc<PipelineRunner>,
    pub retry: RetryPolicy,
    /// Whether the generation credential was present at startup; surfaced by
    /// the health endpoint.
    pub generation_configured: bool,
}

impl AppState {
    pub fn new(
        store: JobStore,
        generation: Arc<dyn GenerationClient>,
        renderer: Arc<dyn RenderBackend>,
        retry: RetryPolicy,
        generation_configured: bool,
    ) -> Self {
        Self {
            store: Arc::new(store),
            generation,
            renderer,
            runner: Arc::new(PipelineRunner::new()),
            retry,
            generation_configured,
        }
    }
}
