use crate::config::ConfigError;
use crate::ecl::EclError;
use crate::fla::AdjustmentError;
use crate::migration::{MigrationError, ObservationImportError};
use crate::staging::{RepositoryError, StagingServiceError};
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
    Input(serde_json::Error),
    Staging(StagingServiceError),
    Migration(MigrationError),
    Observations(ObservationImportError),
    Adjustment(AdjustmentError),
    Ecl(EclError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Input(err) => write!(f, "invalid input: {}", err),
            AppError::Staging(err) => write!(f, "staging error: {}", err),
            AppError::Migration(err) => write!(f, "migration matrix error: {}", err),
            AppError::Observations(err) => write!(f, "observation import error: {}", err),
            AppError::Adjustment(err) => write!(f, "forward-looking adjustment error: {}", err),
            AppError::Ecl(err) => write!(f, "ECL error: {}", err),
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
            AppError::Input(err) => Some(err),
            AppError::Staging(err) => Some(err),
            AppError::Migration(err) => Some(err),
            AppError::Observations(err) => Some(err),
            AppError::Adjustment(err) => Some(err),
            AppError::Ecl(err) => Some(err),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Staging(StagingServiceError::Repository(RepositoryError::NotFound)) => {
                StatusCode::NOT_FOUND
            }
            AppError::Staging(StagingServiceError::InvalidRule(_))
            | AppError::Input(_)
            | AppError::Observations(_) => StatusCode::BAD_REQUEST,
            AppError::Staging(StagingServiceError::RuleSet(_))
            | AppError::Staging(StagingServiceError::Staging(_))
            | AppError::Migration(_)
            | AppError::Adjustment(_)
            | AppError::Ecl(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Staging(StagingServiceError::Repository(RepositoryError::Unavailable(_)))
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
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

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Input(value)
    }
}

impl From<StagingServiceError> for AppError {
    fn from(value: StagingServiceError) -> Self {
        Self::Staging(value)
    }
}

impl From<MigrationError> for AppError {
    fn from(value: MigrationError) -> Self {
        Self::Migration(value)
    }
}

impl From<ObservationImportError> for AppError {
    fn from(value: ObservationImportError) -> Self {
        Self::Observations(value)
    }
}

impl From<AdjustmentError> for AppError {
    fn from(value: AdjustmentError) -> Self {
        Self::Adjustment(value)
    }
}

impl From<EclError> for AppError {
    fn from(value: EclError) -> Self {
        Self::Ecl(value)
    }
}
