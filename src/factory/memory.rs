use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::{RunFilter, RunQueryApi};
use crate::error::ReportError;
use crate::model::{ActivityRecord, PipelineRun};

/// Serves previously captured `queryPipelineRuns` / `queryActivityruns`
/// payloads instead of calling the management API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InMemoryFactory {
    #[serde(default)]
    runs: Vec<PipelineRun>,
    /// Activity records keyed by the pipeline run id they belong to.
    #[serde(default)]
    activities: HashMap<String, Vec<ActivityRecord>>,
}

impl InMemoryFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a capture file: `{"runs": [...], "activities": {"<runId>": [...]}}`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read replay file: {}", path.display()))?;
        let factory: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse replay file: {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            runs = factory.runs.len(),
            "Loaded replay capture"
        );
        Ok(factory)
    }

    pub fn with_run(mut self, run: PipelineRun) -> Self {
        self.runs.push(run);
        self
    }

    pub fn with_activities(mut self, run_id: &str, records: Vec<ActivityRecord>) -> Self {
        self.activities
            .entry(run_id.to_string())
            .or_default()
            .extend(records);
        self
    }
}

#[async_trait::async_trait]
impl RunQueryApi for InMemoryFactory {
    async fn query_runs(&self, filter: &RunFilter) -> Result<Vec<PipelineRun>, ReportError> {
        let runs = match filter.pipeline_names() {
            Some(names) => self
                .runs
                .iter()
                .filter(|r| names.iter().any(|n| n == &r.pipeline_name))
                .cloned()
                .collect(),
            None => self.runs.clone(),
        };
        Ok(runs)
    }

    async fn query_activities(
        &self,
        run_id: &str,
        _filter: &RunFilter,
    ) -> Result<Vec<ActivityRecord>, ReportError> {
        Ok(self.activities.get(run_id).cloned().unwrap_or_default())
    }
}
