use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::ReportError;
use crate::window::WindowError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("invalid run window configuration: {0}")]
    Window(#[from] WindowError),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Report(ReportError::RunNotFound)
            | ApiError::Report(ReportError::UnregisteredScenario(_)) => StatusCode::NOT_FOUND,
            ApiError::Report(ReportError::UnknownActivityKey(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Report(ReportError::ActivityQueryFailure { .. })
            | ApiError::Report(ReportError::MailSendFailure(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Report(ReportError::Template(_)) | ApiError::Window(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Report(e) => e.code(),
            ApiError::Window(_) => "window",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
            code: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
