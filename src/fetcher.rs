//! Collects the monitored activity outcomes of one pipeline run tree.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::ReportError;
use crate::factory::{RunFilter, RunQueryApi};
use crate::model::{ActivityOutcome, RunSnapshot};
use crate::window::RunDateWindow;

pub struct ActivityFetcher<'a> {
    api: &'a dyn RunQueryApi,
    filter: RunFilter,
    monitored: HashSet<&'a str>,
}

impl<'a> ActivityFetcher<'a> {
    pub fn new(api: &'a dyn RunQueryApi, window: &RunDateWindow, monitored: &'a [String]) -> Self {
        Self {
            api,
            filter: RunFilter::window(window),
            monitored: monitored.iter().map(String::as_str).collect(),
        }
    }

    /// Monitored outcomes of `run_id` and of every pipeline it (transitively)
    /// executed. Child runs go on a work queue, so nesting depth is unbounded;
    /// the order they are drained in does not matter.
    pub async fn fetch_outcomes(&self, run_id: &str) -> Result<Vec<ActivityOutcome>, ReportError> {
        let mut outcomes = Vec::new();
        let mut queue = vec![run_id.to_string()];
        let mut seen: HashSet<String> = HashSet::new();

        while let Some(current) = queue.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }

            let records = self.api.query_activities(&current, &self.filter).await?;
            for record in &records {
                if let Some(child) = record.nested_run_id() {
                    debug!(parent = %current, %child, activity = %record.activity_name, "Found nested pipeline run");
                    queue.push(child.to_string());
                }
                if self.monitored.contains(record.activity_name.as_str()) {
                    outcomes.push(record.to_outcome());
                }
            }
        }

        Ok(outcomes)
    }

    /// Snapshot of one run, ready for reconciliation.
    pub async fn fetch(&self, run_id: &str, run_start: DateTime<Utc>) -> Result<RunSnapshot, ReportError> {
        info!(%run_id, "Fetching activities");
        let outcomes = self.fetch_outcomes(run_id).await?;
        Ok(RunSnapshot::new(run_id, run_start, outcomes))
    }
}
