//! HTML rendering through askama; every substituted value is escaped.

use askama::Template;
use serde::Serialize;

use super::ReportRow;
use crate::error::ReportError;

/// Scalar values shown above the activity table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportHeader {
    pub pipeline: String,
    pub run_id: String,
    pub scenario: String,
    pub country: String,
    pub env: String,
    pub filename: String,
    pub services: String,
    pub time_taken: String,
}

struct RowView<'a> {
    activity: &'a str,
    start: &'a str,
    end: &'a str,
    duration: &'a str,
    status: &'static str,
    colour: &'static str,
    error: &'a str,
}

#[derive(Template)]
#[template(path = "report.html")]
struct ReportPage<'a> {
    header: &'a ReportHeader,
    rows: Vec<RowView<'a>>,
}

pub fn render_html(header: &ReportHeader, rows: &[ReportRow]) -> Result<String, ReportError> {
    let page = ReportPage {
        header,
        rows: rows
            .iter()
            .map(|r| RowView {
                activity: &r.activity,
                start: &r.start,
                end: &r.end,
                duration: &r.duration,
                status: r.status.label(),
                colour: r.status.colour(),
                error: &r.error,
            })
            .collect(),
    };
    Ok(page.render()?)
}
