//! Registry of monitored scenarios.
//!
//! A scenario names the pipeline to report on and the activities to show,
//! in display order. Handlers are registered once at startup and looked up
//! by name; an unknown name is an explicit error.

use std::collections::BTreeMap;

use tracing::warn;

use crate::config::ScenarioConfig;
use crate::error::ReportError;

/// A monitored activity and its row label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoredActivity {
    pub name: String,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub pipeline: String,
    pub activities: Vec<MonitoredActivity>,
}

impl Scenario {
    pub fn activity_names(&self) -> Vec<String> {
        self.activities.iter().map(|a| a.name.clone()).collect()
    }

    /// Ordered `(activity name, display name)` pairs.
    pub fn display_map(&self) -> Vec<(String, String)> {
        self.activities
            .iter()
            .map(|a| (a.name.clone(), a.display.clone()))
            .collect()
    }
}

pub trait ScenarioHandler: Send + Sync {
    fn resolve(&self) -> Scenario;
}

/// A scenario fixed at registration time.
pub struct StaticScenario(pub Scenario);

impl ScenarioHandler for StaticScenario {
    fn resolve(&self) -> Scenario {
        self.0.clone()
    }
}

impl From<&ScenarioConfig> for Scenario {
    fn from(cfg: &ScenarioConfig) -> Self {
        Self {
            pipeline: cfg.pipeline.clone(),
            activities: cfg
                .activities
                .iter()
                .map(|a| MonitoredActivity {
                    name: a.name.clone(),
                    display: a.display.clone().unwrap_or_else(|| a.name.clone()),
                })
                .collect(),
        }
    }
}

#[derive(Default)]
pub struct ScenarioRegistry {
    handlers: BTreeMap<String, Box<dyn ScenarioHandler>>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(scenarios: &[ScenarioConfig]) -> Self {
        let mut registry = Self::new();
        for cfg in scenarios {
            registry.register(&cfg.name, StaticScenario(Scenario::from(cfg)));
        }
        registry
    }

    /// Register `handler` under `name`, replacing any earlier registration.
    pub fn register(&mut self, name: &str, handler: impl ScenarioHandler + 'static) {
        if self.handlers.insert(name.to_string(), Box::new(handler)).is_some() {
            warn!(scenario = %name, "Scenario registered twice, keeping the later one");
        }
    }

    pub fn lookup(&self, name: &str) -> Result<Scenario, ReportError> {
        self.handlers
            .get(name)
            .map(|h| h.resolve())
            .ok_or_else(|| ReportError::UnregisteredScenario(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}
