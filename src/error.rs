//! Failure taxonomy for report generation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// Nothing in the date window matched the annotation + file name filter.
    #[error("no pipeline run found for this date range and filter")]
    RunNotFound,

    /// The run/activity query API kept failing (or failed permanently).
    #[error("run/activity query failed after {attempts} attempt(s): {message}")]
    ActivityQueryFailure { attempts: u32, message: String },

    /// The monitored activity list and the display-name map disagree.
    #[error("activity '{0}' has no entry in the display-name map")]
    UnknownActivityKey(String),

    #[error("failed to send report mail: {0}")]
    MailSendFailure(String),

    #[error("scenario '{0}' is not registered")]
    UnregisteredScenario(String),

    #[error("failed to render report: {0}")]
    Template(#[from] askama::Error),
}

impl ReportError {
    /// Stable machine-readable code, used by the HTTP service.
    pub fn code(&self) -> &'static str {
        match self {
            ReportError::RunNotFound => "run_not_found",
            ReportError::ActivityQueryFailure { .. } => "activity_query_failure",
            ReportError::UnknownActivityKey(_) => "unknown_activity_key",
            ReportError::MailSendFailure(_) => "mail_send_failure",
            ReportError::UnregisteredScenario(_) => "unregistered_scenario",
            ReportError::Template(_) => "template",
        }
    }
}
