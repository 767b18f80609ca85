//! Domain error types for server operations.
//!
//! Errors carry full detail for logs; [`IntoResponse`] turns them into
//! user-safe JSON bodies that never expose internals.

use crate::db::StoreError;
use automa_workflow::{InvalidWorkflowName, ValidationError};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rootcause::Report;
use serde::Serialize;
use std::fmt;

/// Workflow-related errors.
#[derive(Debug)]
pub enum WorkflowError {
    /// The request did not identify a user.
    NotAuthenticated,
    /// The workflow does not exist or belongs to someone else.
    NotFound { id: String },
    /// The submitted graph failed validation.
    InvalidGraph(ValidationError),
    /// The submitted name is out of bounds.
    InvalidName(InvalidWorkflowName),
    /// Listing parameters are out of bounds.
    InvalidQuery { details: String },
    /// The request body could not be decoded.
    InvalidBody { status: StatusCode, details: String },
    /// Storage is temporarily unavailable; the request may be retried.
    Unavailable { details: String },
    /// Database error while accessing the workflow.
    DatabaseError { details: String },
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "not authenticated"),
            Self::NotFound { id } => write!(f, "workflow '{id}' not found"),
            Self::InvalidGraph(err) => write!(f, "invalid workflow graph: {err}"),
            Self::InvalidName(err) => write!(f, "invalid workflow name: {err}"),
            Self::InvalidQuery { details } => write!(f, "invalid query: {details}"),
            Self::InvalidBody { details, .. } => write!(f, "invalid request body: {details}"),
            Self::Unavailable { details } => write!(f, "storage unavailable: {details}"),
            Self::DatabaseError { details } => write!(f, "workflow database error: {details}"),
        }
    }
}

impl std::error::Error for WorkflowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidGraph(err) => Some(err),
            Self::InvalidName(err) => Some(err),
            _ => None,
        }
    }
}

impl WorkflowError {
    /// Maps a storage report, logging the full chain for faults.
    pub fn from_store(report: Report<StoreError>) -> Self {
        match report.current_context() {
            StoreError::NotFound { id } => Self::NotFound { id: id.to_string() },
            err @ StoreError::Unavailable { .. } => {
                tracing::warn!(error = %report, "retryable storage failure");
                Self::Unavailable {
                    details: err.to_string(),
                }
            }
            err @ (StoreError::Database { .. } | StoreError::Corrupt { .. }) => {
                tracing::error!(error = %report, "storage failure");
                Self::DatabaseError {
                    details: err.to_string(),
                }
            }
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidGraph(_) | Self::InvalidName(_) | Self::InvalidQuery { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::InvalidBody { status, .. } => *status,
            Self::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::DatabaseError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-safe message for this error.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::NotAuthenticated => "Not authenticated".to_string(),
            Self::NotFound { .. } => "Workflow not found".to_string(),
            Self::InvalidGraph(err) => format!("Invalid workflow graph: {err}"),
            Self::InvalidName(err) => format!("Invalid workflow name: {err}"),
            Self::InvalidQuery { details } => format!("Invalid query: {details}"),
            Self::InvalidBody { details, .. } => format!("Invalid request body: {details}"),
            Self::Unavailable { .. } => "Service temporarily unavailable, try again".to_string(),
            Self::DatabaseError { .. } => "Database error".to_string(),
        }
    }

    /// Whether the client may retry the request unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl From<JsonRejection> for WorkflowError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody {
            status: rejection.status(),
            details: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for WorkflowError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidQuery {
            details: rejection.body_text(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    retryable: bool,
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.public_message(),
            retryable: self.is_retryable(),
        };
        (self.status(), Json(body)).into_response()
    }
}
