//! Pipeline run and activity types, as returned by the management API and
//! as carried through reconciliation.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome status of one activity within one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityStatus {
    Succeeded,
    Failed,
    InProgress,
    Cancelled,
    Queued,
    Skipped,
    /// Requested but absent from the run (backfilled placeholder).
    NotStarted,
    /// A status string the API returned that we do not recognise.
    Unknown,
}

impl ActivityStatus {
    /// Parse the status string used by the activity-run API.
    pub fn from_api(raw: &str) -> Self {
        match raw {
            "Succeeded" => ActivityStatus::Succeeded,
            "Failed" => ActivityStatus::Failed,
            "InProgress" => ActivityStatus::InProgress,
            "Cancelled" | "Canceled" => ActivityStatus::Cancelled,
            "Queued" => ActivityStatus::Queued,
            "Skipped" => ActivityStatus::Skipped,
            _ => ActivityStatus::Unknown,
        }
    }

    pub fn is_succeeded(self) -> bool {
        self == ActivityStatus::Succeeded
    }

    /// Label printed in the report's status cell. Placeholders stay blank.
    pub fn label(self) -> &'static str {
        match self {
            ActivityStatus::Succeeded => "Succeeded",
            ActivityStatus::Failed => "Failed",
            ActivityStatus::InProgress => "InProgress",
            ActivityStatus::Cancelled => "Cancelled",
            ActivityStatus::Queued => "Queued",
            ActivityStatus::Skipped => "Skipped",
            ActivityStatus::NotStarted => "",
            ActivityStatus::Unknown => "Unknown",
        }
    }

    /// Background colour of the status cell.
    pub fn colour(self) -> &'static str {
        match self {
            ActivityStatus::Succeeded => "#015e3c",
            ActivityStatus::InProgress => "#FFFF00",
            ActivityStatus::Failed => "#FF0000",
            ActivityStatus::Cancelled | ActivityStatus::Skipped => "#FFA500",
            ActivityStatus::Queued => "#808080",
            ActivityStatus::NotStarted | ActivityStatus::Unknown => "#FFFFFF",
        }
    }
}

impl std::fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityStatus::NotStarted => write!(f, "NotStarted"),
            other => write!(f, "{}", other.label()),
        }
    }
}

/// One activity's result within one pipeline run.
///
/// A `NotStarted` outcome never carries timestamps, a duration or an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityOutcome {
    pub name: String,
    pub status: ActivityStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    pub error: Option<String>,
}

impl ActivityOutcome {
    pub fn not_started(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ActivityStatus::NotStarted,
            started_at: None,
            ended_at: None,
            duration: None,
            error: None,
        }
    }
}

/// Activity outcomes of a single pipeline run tree, keyed by activity name.
///
/// Built once per run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSnapshot {
    run_id: String,
    run_start: DateTime<Utc>,
    outcomes: BTreeMap<String, ActivityOutcome>,
}

impl RunSnapshot {
    /// When the same activity name shows up more than once (e.g. from two
    /// nested pipelines) the later record wins.
    pub fn new(
        run_id: impl Into<String>,
        run_start: DateTime<Utc>,
        outcomes: impl IntoIterator<Item = ActivityOutcome>,
    ) -> Self {
        let outcomes = outcomes
            .into_iter()
            .map(|o| (o.name.clone(), o))
            .collect();
        Self {
            run_id: run_id.into(),
            run_start,
            outcomes,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn run_start(&self) -> DateTime<Utc> {
        self.run_start
    }

    pub fn outcomes(&self) -> &BTreeMap<String, ActivityOutcome> {
        &self.outcomes
    }

    pub fn get(&self, name: &str) -> Option<&ActivityOutcome> {
        self.outcomes.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// A pipeline run as returned by `queryPipelineRuns`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub run_id: String,
    /// Shared by every run of a re-run chain; equals `run_id` for a fresh run.
    pub run_group_id: String,
    #[serde(default)]
    pub pipeline_name: String,
    pub run_start: Option<DateTime<Utc>>,
    pub run_end: Option<DateTime<Utc>>,
    pub duration_in_ms: Option<u64>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub annotations: Vec<String>,
}

impl PipelineRun {
    /// String value of a run parameter, if present.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_str())
    }
}

/// Error block attached to a failed activity run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityError {
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub message: String,
}

/// An activity run as returned by `queryActivityruns`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub activity_name: String,
    #[serde(default)]
    pub activity_type: String,
    #[serde(default)]
    pub status: String,
    pub activity_run_start: Option<DateTime<Utc>>,
    pub activity_run_end: Option<DateTime<Utc>>,
    pub duration_in_ms: Option<u64>,
    pub output: Option<serde_json::Value>,
    pub error: Option<ActivityError>,
}

impl ActivityRecord {
    pub const EXECUTE_PIPELINE: &'static str = "ExecutePipeline";

    /// Run id of the child pipeline an "execute pipeline" activity triggered.
    pub fn nested_run_id(&self) -> Option<&str> {
        if self.activity_type != Self::EXECUTE_PIPELINE {
            return None;
        }
        self.output
            .as_ref()
            .and_then(|o| o.get("pipelineRunId"))
            .and_then(|v| v.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn to_outcome(&self) -> ActivityOutcome {
        let error = self
            .error
            .as_ref()
            .map(|e| e.message.trim())
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        ActivityOutcome {
            name: self.activity_name.clone(),
            status: ActivityStatus::from_api(&self.status),
            started_at: self.activity_run_start,
            ended_at: self.activity_run_end,
            duration: self.duration_in_ms.map(Duration::from_millis),
            error,
        }
    }
}
