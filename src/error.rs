use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Machine-readable failure category, stable across messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    NotFound,
    BadRequest,
    Conflict,
    Internal,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::BadRequest => "bad_request",
            ErrorCategory::Conflict => "conflict",
            ErrorCategory::Internal => "internal_error",
        }
    }

    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCategory::Conflict => StatusCode::CONFLICT,
            ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(entity: &str, identifier: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{} with identifier '{}' not found", entity, identifier))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn store(message: impl Into<String>, source: DbErr) -> Self {
        AppError::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::NotFound(_) => ErrorCategory::NotFound,
            AppError::BadRequest(_) => ErrorCategory::BadRequest,
            AppError::Conflict(_) => ErrorCategory::Conflict,
            AppError::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::store("database operation failed", err)
    }
}

/// Attaches a context message to store errors while keeping the cause.
pub trait StoreContext<T> {
    fn context(self, message: &str) -> AppResult<T>;

    /// Like `context`, but a unique-constraint violation becomes `Conflict(conflict)`.
    fn or_conflict(self, message: &str, conflict: impl FnOnce() -> String) -> AppResult<T>;
}

impl<T> StoreContext<T> for Result<T, DbErr> {
    fn context(self, message: &str) -> AppResult<T> {
        self.map_err(|e| AppError::store(message, e))
    }

    fn or_conflict(self, message: &str, conflict: impl FnOnce() -> String) -> AppResult<T> {
        self.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                tracing::debug!(%detail, "unique constraint rejected write");
                AppError::Conflict(conflict())
            }
            _ => AppError::store(message, e),
        })
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let category = self.category();
        let message = match &self {
            AppError::Internal { message, source } => {
                match source {
                    Some(cause) => tracing::error!(error = %cause, "{}", message),
                    None => tracing::error!("{}", message),
                }
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            kind: category.as_str(),
            message,
        };

        (category.status_code(), Json(body)).into_response()
    }
}
