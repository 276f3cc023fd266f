use crate::academic::CohortServiceError;
use crate::cie::{CieServiceError, MarkSheetImportError};
use crate::config::ConfigError;
use crate::repository::RepositoryError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Import(MarkSheetImportError),
    Cie(CieServiceError),
    Cohort(CohortServiceError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Import(_) => StatusCode::BAD_REQUEST,
            AppError::Cie(CieServiceError::Repository(RepositoryError::NotFound))
            | AppError::Cie(CieServiceError::UnknownComponent(_))
            | AppError::Cohort(CohortServiceError::UnknownSection(_))
            | AppError::Cohort(CohortServiceError::UnknownBatch(_)) => StatusCode::NOT_FOUND,
            AppError::Cie(CieServiceError::Repository(RepositoryError::Conflict)) => {
                StatusCode::CONFLICT
            }
            AppError::Cie(CieServiceError::Repository(_) | CieServiceError::Aggregation(_))
            | AppError::Cohort(CohortServiceError::Repository(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Cie(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Import(err) => write!(f, "mark sheet error: {}", err),
            AppError::Cie(err) => write!(f, "CIE error: {}", err),
            AppError::Cohort(err) => write!(f, "cohort error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Cie(err) => Some(err),
            AppError::Cohort(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<MarkSheetImportError> for AppError {
    fn from(value: MarkSheetImportError) -> Self {
        Self::Import(value)
    }
}

impl From<CieServiceError> for AppError {
    fn from(value: CieServiceError) -> Self {
        Self::Cie(value)
    }
}

impl From<CohortServiceError> for AppError {
    fn from(value: CohortServiceError) -> Self {
        Self::Cohort(value)
    }
}
