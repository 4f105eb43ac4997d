//! adfreport -- Azure Data Factory pipeline run reports.
//!
//! Finds the latest run of a monitored pipeline, reconstructs its history
//! across re-runs into one status per activity, and renders that as an HTML
//! report for mailing.

pub mod api;
pub mod config;
pub mod error;
pub mod factory;
pub mod fetcher;
pub mod grouper;
pub mod mailer;
pub mod model;
pub mod reconcile;
pub mod report;
pub mod scenario;
pub mod tracker;
pub mod window;

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, Instrument};

use crate::config::Config;
use crate::error::ReportError;
use crate::factory::{RunFilter, RunQueryApi};
use crate::fetcher::ActivityFetcher;
use crate::mailer::{MailMessage, Mailer};
use crate::report::{ReportHeader, ReportRow};
use crate::scenario::ScenarioRegistry;
use crate::window::RunDateWindow;

/// Caller-supplied values for one report.
#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    pub scenario: String,
    pub filename: String,
    /// Doubles as the run annotation filter.
    pub country: String,
    pub env: String,
    pub services: String,
    pub extra_rows: bool,
}

#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub header: ReportHeader,
    pub rows: Vec<ReportRow>,
    pub rerun: bool,
    pub html: String,
}

/// Query, reconcile, assemble and render one report.
///
/// Every failure aborts the whole pass; no partial report is produced.
pub async fn generate_report(
    api: &dyn RunQueryApi,
    registry: &ScenarioRegistry,
    config: &Config,
    window: &RunDateWindow,
    request: &ReportRequest,
) -> Result<GeneratedReport, ReportError> {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("report", %request_id, scenario = %request.scenario);

    async move {
        let scenario = registry.lookup(&request.scenario)?;
        let monitored = scenario.activity_names();
        let annotations = vec![request.country.clone()];
        info!(pipeline = %scenario.pipeline, ?annotations, filename = %request.filename, "Generating report");

        let runs = api
            .query_runs(&RunFilter::pipeline(window, &scenario.pipeline))
            .await?;
        let candidates = grouper::matching_runs(&runs, &annotations, &request.filename);
        let (latest, selection) = grouper::group(&candidates)?;
        let time_taken = report::format::format_duration(grouper::total_run_time(&candidates));

        let fetcher = ActivityFetcher::new(api, window, &monitored);
        let mut snapshots = Vec::new();
        for (run_id, run_start) in selection.runs() {
            snapshots.push(fetcher.fetch(&run_id, run_start).await?);
        }

        let reconciled = reconcile::reconcile(&snapshots, &monitored);
        let mut rows = report::assemble(
            &reconciled,
            &scenario.display_map(),
            config.report.display_offset_hours,
        )?;
        if request.extra_rows {
            report::append_extra_rows(&mut rows, &config.report.extra_rows);
        }

        let header = ReportHeader {
            pipeline: scenario.pipeline.clone(),
            run_id: latest.run_id.clone(),
            scenario: request.scenario.clone(),
            country: request.country.clone(),
            env: request.env.clone(),
            filename: request.filename.clone(),
            services: request.services.clone(),
            time_taken,
        };
        let html = report::render_html(&header, &rows)?;
        info!(run_id = %header.run_id, rows = rows.len(), rerun = selection.is_rerun(), "Report ready");

        Ok(GeneratedReport {
            header,
            rows,
            rerun: selection.is_rerun(),
            html,
        })
    }
    .instrument(span)
    .await
}

/// Mail a generated report.
pub async fn deliver(
    mailer: &dyn Mailer,
    report: &GeneratedReport,
    from: &str,
    recipients: &[String],
    subject: &str,
) -> Result<(), ReportError> {
    let message = MailMessage {
        from: from.to_string(),
        recipients: recipients.to_vec(),
        subject: subject.to_string(),
        html: report.html.clone(),
    };
    mailer.send(&message).await
}

/// Serve report generation over HTTP until the process is stopped.
pub async fn serve(bind: &str, api: Arc<dyn RunQueryApi>, config: Config) -> Result<()> {
    let registry = ScenarioRegistry::from_config(&config.scenarios);
    let state = api::state::AppState {
        api,
        registry: Arc::new(registry),
        config: Arc::new(config),
    };

    let addr: std::net::SocketAddr = bind.parse()?;
    let app = api::router(state);

    tracing::info!(%addr, "adfreport listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActivityDisplayConfig, ScenarioConfig};
    use crate::factory::InMemoryFactory;
    use crate::model::{ActivityRecord, ActivityStatus, PipelineRun};
    use std::sync::Mutex;

    fn window() -> RunDateWindow {
        RunDateWindow {
            last_run: "2021-03-25T13:00:00Z".parse().unwrap(),
            today: "2021-03-26T09:00:00Z".parse().unwrap(),
        }
    }

    fn config() -> Config {
        let activities = ["Copy", "Transform", "Publish"]
            .iter()
            .map(|n| ActivityDisplayConfig {
                name: n.to_string(),
                display: Some(format!("{n} step")),
            })
            .collect();
        Config {
            scenarios: vec![ScenarioConfig {
                name: "daily_load".to_string(),
                pipeline: "PL_Daily_Load".to_string(),
                activities,
            }],
            ..Config::default()
        }
    }

    fn run(run_id: &str, group: &str, start: &str, ms: u64) -> PipelineRun {
        serde_json::from_value(serde_json::json!({
            "runId": run_id,
            "runGroupId": group,
            "pipelineName": "PL_Daily_Load",
            "runStart": start,
            "durationInMs": ms,
            "parameters": { "fileName": "sales.csv" },
            "annotations": ["UK"],
        }))
        .unwrap()
    }

    fn activity(name: &str, status: &str) -> ActivityRecord {
        serde_json::from_value(serde_json::json!({
            "activityName": name,
            "activityType": "Copy",
            "status": status,
            "activityRunStart": "2021-03-25T17:05:13Z",
            "durationInMs": 1000,
        }))
        .unwrap()
    }

    fn request() -> ReportRequest {
        ReportRequest {
            scenario: "daily_load".to_string(),
            filename: "sales.csv".to_string(),
            country: "UK".to_string(),
            env: "prod".to_string(),
            services: "sales".to_string(),
            extra_rows: false,
        }
    }

    fn rerun_factory() -> InMemoryFactory {
        InMemoryFactory::new()
            .with_run(run("first", "first", "2021-03-25T17:05:13Z", 600_000))
            .with_run(run("second", "first", "2021-03-26T05:54:50Z", 60_000))
            .with_activities(
                "first",
                vec![activity("Copy", "Succeeded"), activity("Transform", "Failed")],
            )
            .with_activities("second", vec![activity("Transform", "Succeeded")])
    }

    #[tokio::test]
    async fn test_rerun_report_end_to_end() {
        let config = config();
        let registry = ScenarioRegistry::from_config(&config.scenarios);
        let api = rerun_factory();

        let report = generate_report(&api, &registry, &config, &window(), &request())
            .await
            .unwrap();

        assert!(report.rerun);
        assert_eq!(report.header.run_id, "second");
        assert_eq!(report.header.time_taken, "00:11:00");
        let statuses: Vec<(&str, ActivityStatus)> = report
            .rows
            .iter()
            .map(|r| (r.activity.as_str(), r.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("Copy step", ActivityStatus::Succeeded),
                ("Transform step", ActivityStatus::Succeeded),
                ("Publish step", ActivityStatus::NotStarted),
            ]
        );
        assert!(report.html.contains("Transform step"));
    }

    #[tokio::test]
    async fn test_extra_rows_appended() {
        let config = config();
        let registry = ScenarioRegistry::from_config(&config.scenarios);
        let mut req = request();
        req.extra_rows = true;

        let report = generate_report(&rerun_factory(), &registry, &config, &window(), &req)
            .await
            .unwrap();
        assert_eq!(report.rows.len(), 5);
        assert_eq!(report.rows[3].activity, "Model Refresh");
    }

    #[tokio::test]
    async fn test_no_matching_run() {
        let config = config();
        let registry = ScenarioRegistry::from_config(&config.scenarios);
        let mut req = request();
        req.filename = "other.csv".to_string();

        let err = generate_report(&rerun_factory(), &registry, &config, &window(), &req)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::RunNotFound));
    }

    #[tokio::test]
    async fn test_unregistered_scenario() {
        let config = config();
        let registry = ScenarioRegistry::from_config(&config.scenarios);
        let mut req = request();
        req.scenario = "weekly".to_string();

        let err = generate_report(&rerun_factory(), &registry, &config, &window(), &req)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::UnregisteredScenario(_)));
    }

    struct RecordingMailer {
        sent: Mutex<Vec<MailMessage>>,
    }

    #[async_trait::async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &MailMessage) -> Result<(), ReportError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_deliver_sends_rendered_html() {
        let config = config();
        let registry = ScenarioRegistry::from_config(&config.scenarios);
        let report = generate_report(&rerun_factory(), &registry, &config, &window(), &request())
            .await
            .unwrap();

        let mailer = RecordingMailer {
            sent: Mutex::new(Vec::new()),
        };
        deliver(&mailer, &report, "noreply@something.com", &["ops@example.com".to_string()], "Daily load")
            .await
            .unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Daily load");
        assert_eq!(sent[0].html, report.html);
    }
}
