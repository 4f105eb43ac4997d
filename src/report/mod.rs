//! Turns a reconciled report into ordered, display-ready rows and renders
//! them to HTML.

pub mod format;
pub mod html;

use std::collections::HashSet;

use serde::Serialize;

use crate::error::ReportError;
use crate::model::{ActivityOutcome, ActivityStatus};
use crate::reconcile::ReconciledReport;

pub use self::html::{render_html, ReportHeader};

/// One row of the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub activity: String,
    pub status: ActivityStatus,
    pub start: String,
    pub end: String,
    pub duration: String,
    pub error: String,
}

impl ReportRow {
    pub fn from_outcome(display: &str, outcome: &ActivityOutcome, offset_hours: i64) -> Self {
        Self {
            activity: display.to_string(),
            status: outcome.status,
            start: outcome
                .started_at
                .map(|t| format::format_timestamp(t, offset_hours))
                .unwrap_or_default(),
            end: outcome
                .ended_at
                .map(|t| format::format_timestamp(t, offset_hours))
                .unwrap_or_default(),
            duration: outcome.duration.map(format::format_duration).unwrap_or_default(),
            error: outcome.error.clone().unwrap_or_default(),
        }
    }

    /// Blank placeholder row (e.g. manual follow-up steps).
    pub fn placeholder(display: &str) -> Self {
        Self::from_outcome(display, &ActivityOutcome::not_started(display), 0)
    }
}

/// Order and rename `report` by `display_map` (activity name, display name).
///
/// The map's order replaces whatever order the report had. Every activity in
/// the report must have a map entry; map entries with no activity are skipped.
pub fn assemble(
    report: &ReconciledReport,
    display_map: &[(String, String)],
    offset_hours: i64,
) -> Result<Vec<ReportRow>, ReportError> {
    let known: HashSet<&str> = display_map.iter().map(|(name, _)| name.as_str()).collect();
    if let Some(unknown) = report.outcomes().keys().find(|k| !known.contains(k.as_str())) {
        return Err(ReportError::UnknownActivityKey(unknown.clone()));
    }

    Ok(display_map
        .iter()
        .filter_map(|(name, display)| {
            report
                .get(name)
                .map(|outcome| ReportRow::from_outcome(display, outcome, offset_hours))
        })
        .collect())
}

/// Append blank rows for `extra` names after the activity rows.
pub fn append_extra_rows(rows: &mut Vec<ReportRow>, extra: &[String]) {
    rows.extend(extra.iter().map(|name| ReportRow::placeholder(name)));
}
