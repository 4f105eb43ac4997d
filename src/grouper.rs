//! Picks the latest matching run and works out whether it is part of a
//! re-run chain.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::ReportError;
use crate::model::PipelineRun;

/// Run parameter carrying the processed file name.
pub const FILE_NAME_PARAMETER: &str = "fileName";

/// A pipeline run that passed the annotation + file name filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRun {
    pub run_id: String,
    pub run_group_id: String,
    pub run_start: DateTime<Utc>,
    pub duration: Option<Duration>,
}

/// Which runs have to be fetched to report on the latest one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSelection {
    /// The latest run is not part of a re-run chain.
    Single { run_id: String, run_start: DateTime<Utc> },
    /// Every run sharing the latest run's group id, oldest first.
    Rerun {
        group_id: String,
        runs: Vec<(String, DateTime<Utc>)>,
    },
}

impl RunSelection {
    /// `(run id, start)` pairs to fetch, in chronological order.
    pub fn runs(&self) -> Vec<(String, DateTime<Utc>)> {
        match self {
            RunSelection::Single { run_id, run_start } => vec![(run_id.clone(), *run_start)],
            RunSelection::Rerun { runs, .. } => runs.clone(),
        }
    }

    pub fn is_rerun(&self) -> bool {
        matches!(self, RunSelection::Rerun { .. })
    }
}

/// Keep runs whose annotations equal `annotations` exactly and whose file
/// name parameter equals `filename`. Runs that have not started yet are
/// skipped.
pub fn matching_runs(runs: &[PipelineRun], annotations: &[String], filename: &str) -> Vec<CandidateRun> {
    runs.iter()
        .filter(|r| r.annotations == annotations && r.parameter(FILE_NAME_PARAMETER) == Some(filename))
        .filter_map(|r| match r.run_start {
            Some(run_start) => Some(CandidateRun {
                run_id: r.run_id.clone(),
                run_group_id: r.run_group_id.clone(),
                run_start,
                duration: r.duration_in_ms.map(Duration::from_millis),
            }),
            None => {
                warn!(run_id = %r.run_id, "Skipping run without a start time");
                None
            }
        })
        .collect()
}

/// Sum of the durations of all candidate runs; unfinished runs count zero.
pub fn total_run_time(runs: &[CandidateRun]) -> Duration {
    runs.iter().filter_map(|r| r.duration).sum()
}

/// Most recent candidate by start time.
pub fn latest_run(runs: &[CandidateRun]) -> Result<&CandidateRun, ReportError> {
    runs.iter()
        .max_by_key(|r| r.run_start)
        .ok_or(ReportError::RunNotFound)
}

/// Decide whether `target` belongs to a re-run group: it does when at least
/// one other run shares its group id.
pub fn select_runs(runs: &[CandidateRun], target: &CandidateRun) -> RunSelection {
    let mut group: Vec<&CandidateRun> = runs
        .iter()
        .filter(|r| r.run_group_id == target.run_group_id)
        .collect();

    let has_sibling = group.iter().any(|r| r.run_id != target.run_id);
    if !has_sibling {
        return RunSelection::Single {
            run_id: target.run_id.clone(),
            run_start: target.run_start,
        };
    }

    // Stable: equal start times keep query order.
    group.sort_by_key(|r| r.run_start);
    group.dedup_by(|a, b| a.run_id == b.run_id);

    info!(
        run_id = %target.run_id,
        group_id = %target.run_group_id,
        runs = group.len(),
        "Latest run is part of a re-run"
    );
    RunSelection::Rerun {
        group_id: target.run_group_id.clone(),
        runs: group.iter().map(|r| (r.run_id.clone(), r.run_start)).collect(),
    }
}

/// Latest run plus the runs needed to reconstruct its history.
pub fn group(runs: &[CandidateRun]) -> Result<(CandidateRun, RunSelection), ReportError> {
    let latest = latest_run(runs)?;
    info!(run_id = %latest.run_id, "Latest run id");
    Ok((latest.clone(), select_runs(runs, latest)))
}
