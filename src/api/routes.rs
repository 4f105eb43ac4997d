//! API route definitions.

use axum::extract::{Path, Query, State};
use axum::response::Html;
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiResult;
use super::state::AppState;
use crate::window::RunDateWindow;
use crate::{generate_report, ReportRequest};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/scenarios", get(list_scenarios))
        .route("/reports/{scenario}", get(render_report))
}

/// Liveness plus what this instance would report on.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let window = &state.config.window;
    Json(json!({
        "data": {
            "status": "ok",
            "scenarios": state.registry.names().count(),
            "window": {
                "timezone": window.timezone,
                "cutoff_hour": window.cutoff_hour,
                "lookback_days": window.lookback_days
            }
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

async fn list_scenarios(State(state): State<AppState>) -> Json<Value> {
    let names: Vec<&str> = state.registry.names().collect();
    Json(json!({ "data": names, "meta": { "total": names.len() } }))
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    filename: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    env: String,
    #[serde(default)]
    services: String,
    #[serde(default)]
    extra_rows: bool,
}

async fn render_report(
    State(state): State<AppState>,
    Path(scenario): Path<String>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Html<String>> {
    let window = RunDateWindow::current(&state.config.window)?;
    let request = ReportRequest {
        scenario,
        filename: query.filename,
        country: query.country,
        env: query.env,
        services: query.services,
        extra_rows: query.extra_rows,
    };
    let report = generate_report(
        state.api.as_ref(),
        &state.registry,
        &state.config,
        &window,
        &request,
    )
    .await?;
    Ok(Html(report.html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActivityDisplayConfig, Config, ScenarioConfig};
    use crate::factory::InMemoryFactory;
    use crate::scenario::ScenarioRegistry;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(activities: &[&str]) -> AppState {
        let config = Config {
            scenarios: vec![ScenarioConfig {
                name: "daily_load".to_string(),
                pipeline: "PL_Daily_Load".to_string(),
                activities: activities
                    .iter()
                    .map(|n| ActivityDisplayConfig {
                        name: n.to_string(),
                        display: None,
                    })
                    .collect(),
            }],
            ..Config::default()
        };
        let factory: InMemoryFactory = serde_json::from_value(json!({
            "runs": [{
                "runId": "r1",
                "runGroupId": "r1",
                "pipelineName": "PL_Daily_Load",
                "runStart": "2021-03-25T17:05:13Z",
                "durationInMs": 90000,
                "parameters": { "fileName": "sales.csv" },
                "annotations": ["UK"]
            }],
            "activities": {
                "r1": [{
                    "activityName": "Copy",
                    "activityType": "Copy",
                    "status": "Succeeded",
                    "activityRunStart": "2021-03-25T17:05:13Z",
                    "durationInMs": 1000
                }]
            }
        }))
        .unwrap();

        AppState {
            api: Arc::new(factory),
            registry: Arc::new(ScenarioRegistry::from_config(&config.scenarios)),
            config: Arc::new(config),
        }
    }

    async fn get(state: AppState, uri: &str) -> (StatusCode, String) {
        let response = crate::api::router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get(state(&["Copy"]), "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["data"]["status"], "ok");
        assert_eq!(value["data"]["scenarios"], 1);
        assert_eq!(value["data"]["window"]["timezone"], "Europe/London");
        assert_eq!(value["data"]["window"]["cutoff_hour"], 14);
    }

    #[tokio::test]
    async fn test_scenarios_listed() {
        let (status, body) = get(state(&["Copy"]), "/api/v1/scenarios").await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["data"], json!(["daily_load"]));
    }

    #[tokio::test]
    async fn test_report_rendered() {
        let (status, body) = get(
            state(&["Copy", "Publish"]),
            "/api/v1/reports/daily_load?filename=sales.csv&country=UK",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<html>"));
        assert!(body.contains("Publish"));
        assert!(body.contains("00:01:30"));
    }

    #[tokio::test]
    async fn test_unknown_scenario_is_404() {
        let (status, body) = get(state(&["Copy"]), "/api/v1/reports/weekly?filename=sales.csv&country=UK").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["code"], "unregistered_scenario");
    }

    #[tokio::test]
    async fn test_no_matching_run_is_404() {
        let (status, body) = get(state(&["Copy"]), "/api/v1/reports/daily_load?filename=sales.csv&country=FR").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("run_not_found"));
    }

    #[tokio::test]
    async fn test_unknown_path_is_json_404() {
        let (status, body) = get(state(&["Copy"]), "/api/v2/reports").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["code"], "not_found");
    }

    #[tokio::test]
    async fn test_missing_filename_rejected() {
        let (status, _) = get(state(&["Copy"]), "/api/v1/reports/daily_load?country=UK").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
