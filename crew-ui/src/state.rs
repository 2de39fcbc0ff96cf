//! Shared application state for the UI server.

use std::sync::Arc;

use anyhow::Result;
use crew::io::config::CrewConfig;
use crew::io::executor::Executor;
use crew::pipeline::PipelineEvent;
use tokio::sync::broadcast;

use crate::render::Pages;

/// Agent backend shared by every request.
pub type SharedExecutor = Arc<dyn Executor + Send + Sync>;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Pipeline configuration, loaded once at startup.
    pub config: Arc<CrewConfig>,
    /// Backend that answers agent prompts.
    pub executor: SharedExecutor,
    /// Broadcast sender for pipeline progress events.
    pub event_tx: Arc<broadcast::Sender<PipelineEvent>>,
    /// Compiled HTML templates.
    pub pages: Arc<Pages>,
}

impl AppState {
    pub fn new(config: CrewConfig, executor: SharedExecutor) -> Result<Self> {
        let (event_tx, _) = broadcast::channel(64);
        Ok(Self {
            config: Arc::new(config),
            executor,
            event_tx: Arc::new(event_tx),
            pages: Arc::new(Pages::new()?),
        })
    }
}
