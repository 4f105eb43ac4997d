//! Run/activity query API of the data factory.
//!
//! `RunQueryApi` is the seam the rest of the crate talks to; `client` is the
//! Azure management REST implementation and `memory` serves captured
//! responses for offline replay.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ReportError;
use crate::model::{ActivityRecord, PipelineRun};
use crate::window::RunDateWindow;

pub mod client;
pub mod memory;
pub mod retry;

pub use self::client::AzureFactoryClient;
pub use self::memory::InMemoryFactory;
pub use self::retry::RetryPolicy;

/// Body of `queryPipelineRuns` / `queryActivityruns`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFilter {
    pub last_updated_after: DateTime<Utc>,
    pub last_updated_before: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<RunQueryFilter>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunQueryFilter {
    pub operand: String,
    pub operator: String,
    pub values: Vec<String>,
}

impl RunFilter {
    /// Unfiltered query over the window (used for activity runs).
    pub fn window(window: &RunDateWindow) -> Self {
        Self {
            last_updated_after: window.last_run,
            last_updated_before: window.today,
            filters: Vec::new(),
        }
    }

    /// Runs of the named pipeline within the window.
    pub fn pipeline(window: &RunDateWindow, pipeline: &str) -> Self {
        let mut filter = Self::window(window);
        filter.filters.push(RunQueryFilter {
            operand: "PipelineName".to_string(),
            operator: "In".to_string(),
            values: vec![pipeline.to_string()],
        });
        filter
    }

    /// Pipeline names an `In` filter on `PipelineName` admits, if any.
    pub fn pipeline_names(&self) -> Option<&[String]> {
        self.filters
            .iter()
            .find(|f| f.operand == "PipelineName" && f.operator == "In")
            .map(|f| f.values.as_slice())
    }
}

/// Trait for anything that can answer run and activity queries.
#[async_trait::async_trait]
pub trait RunQueryApi: Send + Sync {
    /// All pipeline runs matching `filter`, across every result page.
    async fn query_runs(&self, filter: &RunFilter) -> Result<Vec<PipelineRun>, ReportError>;

    /// All activity runs of one pipeline run, across every result page.
    async fn query_activities(
        &self,
        run_id: &str,
        filter: &RunFilter,
    ) -> Result<Vec<ActivityRecord>, ReportError>;
}
