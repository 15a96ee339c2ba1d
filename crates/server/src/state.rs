//! Shared application state

use std::sync::Arc;

use climate_agent_config::Settings;
use climate_agent_pipeline::ClimatePipeline;

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ClimatePipeline>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(pipeline: Arc<ClimatePipeline>, settings: Arc<Settings>) -> Self {
        Self { pipeline, settings }
    }
}
