use std::sync::Arc;

use crate::config::Config;
use crate::factory::RunQueryApi;
use crate::scenario::ScenarioRegistry;

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn RunQueryApi>,
    pub registry: Arc<ScenarioRegistry>,
    pub config: Arc<Config>,
}
