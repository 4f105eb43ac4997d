//! HTTP service exposing report generation.

pub mod error;
mod routes;
pub mod state;

use self::error::ErrorBody;
use self::state::AppState;
use axum::http::StatusCode;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

/// Report service router: `/api/v1` routes, request tracing, JSON 404s.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn fallback() -> (StatusCode, Json<ErrorBody>) {
    let body = ErrorBody {
        error: "no such route".to_string(),
        code: "not_found".to_string(),
    };
    (StatusCode::NOT_FOUND, Json(body))
}
