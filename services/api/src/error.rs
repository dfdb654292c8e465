//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! error is rendered as an HTTP response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use study_planner_core::{PortError, ScheduleError};
use tracing::error;

use crate::config::ConfigError;
use crate::web::protocol::ApiResponse;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents a failed schedule operation.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a migration failure at startup.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A request the handler could not parse.
    #[error("{0}")]
    BadRequest(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Schedule(e) => match e {
                ScheduleError::InvalidConfig(_) | ScheduleError::InvalidRequest(_) => {
                    StatusCode::BAD_REQUEST
                }
                ScheduleError::NoActiveSchedule(_) => StatusCode::NOT_FOUND,
                ScheduleError::AlreadyExists(_) => StatusCode::CONFLICT,
                ScheduleError::UnknownUnit { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                ScheduleError::Port(port) => port_status(port),
            },
            ApiError::Port(port) => port_status(port),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn port_status(error: &PortError) -> StatusCode {
    match error {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Conflict(_) => StatusCode::CONFLICT,
        PortError::Unauthorized => StatusCode::UNAUTHORIZED,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("Request failed: {:?}", self);
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };
        (status, ApiResponse::<()>::failure(message)).into_response()
    }
}
