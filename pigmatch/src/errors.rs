use crate::db::errors::DbError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Name of the partial unique index guarding one pending request per (hunter, sighting).
pub const PENDING_REQUEST_INDEX: &str = "access_requests_one_pending_idx";

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable kind, e.g. `conflict` or `duplicate_pending`
    pub error: String,
    pub message: String,
}

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Caller is not a party allowed to perform the operation
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Invalid request data
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Entity is not in a state that permits the transition
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// Booking window is empty or not in the future
    #[error("Invalid window: {message}")]
    InvalidWindow { message: String },

    /// The property has no free capacity in the requested window
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// A pending request already exists for this hunter and sighting
    #[error("Hunter {hunter_id} already has a pending request for sighting {sighting_id}")]
    DuplicatePending { hunter_id: Uuid, sighting_id: Uuid },

    /// The booking has already started
    #[error("Match {match_id} has already started")]
    Expired { match_id: Uuid },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        Error::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Error::Forbidden { message: message.into() }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Error::InvalidState { message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest { message: message.into() }
    }

    /// Stable machine-readable error kind, used as the `error` field of response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Unauthenticated { .. } => "unauthenticated",
            Error::Forbidden { .. } => "forbidden",
            Error::BadRequest { .. } => "bad_request",
            Error::NotFound { .. } => "not_found",
            Error::InvalidState { .. } => "invalid_state",
            Error::InvalidWindow { .. } => "invalid_window",
            Error::Conflict { .. } => "conflict",
            Error::DuplicatePending { .. } => "duplicate_pending",
            Error::Expired { .. } => "expired",
            Error::Internal { .. } | Error::Other(_) => "internal",
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "not_found",
                DbError::UniqueViolation { .. } => "conflict",
                DbError::ForeignKeyViolation { .. } | DbError::CheckViolation { .. } => "bad_request",
                DbError::CorruptValue { .. } | DbError::Other(_) => "internal",
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::InvalidWindow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::InvalidState { .. } | Error::Conflict { .. } | Error::DuplicatePending { .. } | Error::Expired { .. } => {
                StatusCode::CONFLICT
            }
            Error::Internal { .. } | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CorruptValue { .. } | DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::Internal { .. } | Error::Other(_) => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { .. } => "Resource already exists".to_string(),
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::CorruptValue { .. } | DbError::Other(_) => "Database error occurred".to_string(),
            },
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_) | DbError::CorruptValue { .. }) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Conflict { .. } | Error::DuplicatePending { .. } | Error::InvalidState { .. } | Error::Expired { .. } => {
                tracing::warn!("Conflict error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::Forbidden { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } | Error::InvalidWindow { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let body = ErrorBody {
            error: self.kind().to_string(),
            message: self.user_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Database(DbError::from(err))
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: Error) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_status_mapping_for_every_kind() {
        let id = Uuid::new_v4();
        let cases = vec![
            (Error::not_found("Match", id), StatusCode::NOT_FOUND, "not_found"),
            (Error::forbidden("not a party"), StatusCode::FORBIDDEN, "forbidden"),
            (Error::invalid_state("already approved"), StatusCode::CONFLICT, "invalid_state"),
            (
                Error::InvalidWindow {
                    message: "end must be after start".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_window",
            ),
            (Error::Conflict { message: "full".into() }, StatusCode::CONFLICT, "conflict"),
            (
                Error::DuplicatePending {
                    hunter_id: id,
                    sighting_id: id,
                },
                StatusCode::CONFLICT,
                "duplicate_pending",
            ),
            (Error::Expired { match_id: id }, StatusCode::CONFLICT, "expired"),
            (Error::Unauthenticated { message: None }, StatusCode::UNAUTHORIZED, "unauthenticated"),
            (Error::bad_request("bad lat"), StatusCode::BAD_REQUEST, "bad_request"),
            (
                Error::Internal {
                    operation: "load".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
            ),
            (Error::Database(DbError::NotFound), StatusCode::NOT_FOUND, "not_found"),
            (Error::Other(anyhow::anyhow!("boom")), StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        ];

        for (err, status, kind) in cases {
            let (got_status, body) = render(err).await;
            assert_eq!(got_status, status);
            assert_eq!(body["error"], kind);
            assert!(body["message"].is_string());
        }
    }

    #[tokio::test]
    async fn test_internal_details_are_not_leaked() {
        let (_, body) = render(Error::Other(anyhow::anyhow!("connection string postgres://secret"))).await;
        assert_eq!(body["message"], "Internal server error");
    }
}
