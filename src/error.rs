use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::{
    dao::storage::StorageError, services::generator::GeneratorError, state::validator::MatchError,
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// A persisted record could not be read back as a valid match.
    #[error("stored match is corrupted: {0}")]
    Corrupted(String),
    /// Caller identity is missing.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Requested match was not found.
    #[error("match not found: {0}")]
    NotFound(String),
    /// The validator or a mode engine rejected the action.
    #[error(transparent)]
    Match(#[from] MatchError),
    /// The generator or scorer failed or timed out.
    #[error("upstream generator failure")]
    Generator(#[source] GeneratorError),
    /// Two conditional writes in a row lost the race.
    #[error("match was modified concurrently; retry the action")]
    StoreConflict,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Corrupted { .. } => ServiceError::Corrupted(err.to_string()),
            other => ServiceError::Unavailable(other),
        }
    }
}

impl From<GeneratorError> for ServiceError {
    fn from(err: GeneratorError) -> Self {
        ServiceError::Generator(err)
    }
}

impl ServiceError {
    /// Stable machine-readable code, shared by the HTTP body and WebSocket errors.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Unavailable(_) | ServiceError::Degraded => "STORAGE_UNAVAILABLE",
            ServiceError::Corrupted(_) => "STORAGE_CORRUPTED",
            ServiceError::Unauthorized(_) => "UNAUTHENTICATED",
            ServiceError::InvalidInput(_) => "INVALID_INPUT",
            ServiceError::NotFound(_) => "MATCH_NOT_FOUND",
            ServiceError::Match(err) => match err {
                MatchError::NotParticipant => "NOT_PARTICIPANT",
                MatchError::MatchNotActive(_) => "MATCH_NOT_ACTIVE",
                MatchError::MatchAlreadyOver => "MATCH_ALREADY_OVER",
                MatchError::ActionNotPermitted { .. } => "ACTION_NOT_PERMITTED",
                MatchError::AlreadyStarted => "ALREADY_STARTED",
                MatchError::NotYourTurn => "NOT_YOUR_TURN",
                MatchError::AlreadySubmitted => "ALREADY_SUBMITTED",
                MatchError::AlreadyBuzzed => "ALREADY_BUZZED",
                MatchError::InvalidAction(_) => "INVALID_ACTION",
            },
            ServiceError::Generator(_) => "UPSTREAM_GENERATOR_FAILURE",
            ServiceError::StoreConflict => "STORE_CONFLICT",
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {1}")]
    BadRequest(&'static str, String),
    /// Missing caller identity.
    #[error("unauthorized: {1}")]
    Unauthorized(&'static str, String),
    /// Caller may not perform the action.
    #[error("forbidden: {1}")]
    Forbidden(&'static str, String),
    /// Requested resource not found.
    #[error("not found: {1}")]
    NotFound(&'static str, String),
    /// Conflict with current state.
    #[error("conflict: {1}")]
    Conflict(&'static str, String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {1}")]
    ServiceUnavailable(&'static str, String),
    /// Internal server error.
    #[error("internal error: {1}")]
    Internal(&'static str, String),
}

impl AppError {
    /// Rejection for a request without a participant identity.
    pub fn unauthenticated() -> Self {
        AppError::Unauthorized("UNAUTHENTICATED", "missing X-Participant-Id header".into())
    }

    /// Rejection for a malformed or unknown match code.
    pub fn unknown_match(code: &str) -> Self {
        AppError::NotFound("MATCH_NOT_FOUND", format!("match `{code}` not found"))
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(code, _)
            | AppError::Unauthorized(code, _)
            | AppError::Forbidden(code, _)
            | AppError::NotFound(code, _)
            | AppError::Conflict(code, _)
            | AppError::ServiceUnavailable(code, _)
            | AppError::Internal(code, _) => code,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let code = err.code();
        let message = err.to_string();
        match err {
            ServiceError::Unavailable(_) | ServiceError::Degraded => {
                AppError::ServiceUnavailable(code, message)
            }
            ServiceError::Corrupted(_) => {
                error!(error = %message, "refusing to serve a corrupted match record");
                AppError::Internal(code, message)
            }
            ServiceError::Unauthorized(_) => AppError::Unauthorized(code, message),
            ServiceError::InvalidInput(_) => AppError::BadRequest(code, message),
            ServiceError::NotFound(_) => AppError::NotFound(code, message),
            ServiceError::Match(
                MatchError::NotParticipant
                | MatchError::ActionNotPermitted { .. }
                | MatchError::NotYourTurn,
            ) => AppError::Forbidden(code, message),
            ServiceError::Match(MatchError::AlreadySubmitted | MatchError::AlreadyBuzzed) => {
                AppError::Conflict(code, message)
            }
            ServiceError::Match(_) => AppError::BadRequest(code, message),
            ServiceError::Generator(source) => {
                error!(error = %source, "generator call failed");
                AppError::Internal(code, message)
            }
            ServiceError::StoreConflict => AppError::Conflict(code, message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(..) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(..) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(..) => StatusCode::FORBIDDEN,
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::Conflict(..) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(..) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(..) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            code: self.code(),
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
