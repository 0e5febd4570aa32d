use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tokio_postgres::error::SqlState;

use crate::models::FieldError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    /// Replaces the message of a persistence failure, leaving validation and
    /// internal errors as they are.
    pub fn with_message(self, message: impl Into<String>) -> Self {
        match self {
            ApiError::Database(_) => ApiError::Database(message.into()),
            other => other,
        }
    }

    /// Uses `fallback` when a persistence failure carries no message.
    pub fn or_message(self, fallback: &str) -> Self {
        match self {
            ApiError::Database(ref message) if message.trim().is_empty() => {
                ApiError::Database(fallback.to_string())
            }
            other => other,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                tracing::debug!("Request validation failed: {}", summarize(&errors));
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            ApiError::Database(message) => {
                tracing::error!("Database error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": message })),
                )
                    .into_response()
            }
            ApiError::Internal(err) => {
                tracing::error!("Internal server error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "An internal server error occurred" })),
                )
                    .into_response()
            }
        }
    }
}

// PostgreSQL error mapping
impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.code() {
            Some(&SqlState::NOT_NULL_VIOLATION) => {
                let field = if err.to_string().contains("title") {
                    "title"
                } else {
                    "body"
                };
                ApiError::validation(field, format!("{} can not be empty!", field))
            }
            Some(&SqlState::CHECK_VIOLATION) => {
                ApiError::validation("body", "Data validation constraint violated")
            }
            Some(&SqlState::INVALID_TEXT_REPRESENTATION) => {
                ApiError::validation("body", "Invalid data format provided")
            }
            Some(&SqlState::NUMERIC_VALUE_OUT_OF_RANGE) => {
                ApiError::validation("id", "Numeric value is out of range")
            }
            Some(&SqlState::STRING_DATA_RIGHT_TRUNCATION) => {
                ApiError::validation("title", "Text data exceeds maximum length")
            }
            Some(&SqlState::CONNECTION_EXCEPTION)
            | Some(&SqlState::CONNECTION_DOES_NOT_EXIST)
            | Some(&SqlState::CONNECTION_FAILURE) => {
                tracing::error!("PostgreSQL connection error: {}", err);
                ApiError::Database("Database connection unavailable".to_string())
            }
            Some(&SqlState::UNDEFINED_TABLE) => {
                tracing::error!("PostgreSQL schema error: {}", err);
                ApiError::Database("Tutorials table does not exist".to_string())
            }
            _ => {
                tracing::error!("Unhandled PostgreSQL error: {} (code: {:?})", err, err.code());
                ApiError::Database(format!("Database operation failed: {}", err))
            }
        }
    }
}

// Connection pool error mapping
impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        match err {
            deadpool_postgres::PoolError::Timeout(_) => {
                tracing::warn!("Database connection pool timeout: {}", err);
                ApiError::Database("Database connection timeout".to_string())
            }
            deadpool_postgres::PoolError::Closed => {
                tracing::error!("Database connection pool is closed: {}", err);
                ApiError::Database("Database service unavailable".to_string())
            }
            deadpool_postgres::PoolError::NoRuntimeSpecified => {
                tracing::error!("Database pool runtime error: {}", err);
                ApiError::Internal(anyhow::anyhow!("Database configuration error"))
            }
            _ => {
                tracing::error!("Database connection pool error: {}", err);
                ApiError::Database("Database connection unavailable".to_string())
            }
        }
    }
}

// Result type alias for convenience
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_response() {
        let response = ApiError::validation("title", "title can not be empty!").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(
            body,
            json!({ "errors": [{ "field": "title", "message": "title can not be empty!" }] })
        );
    }

    #[tokio::test]
    async fn test_database_error_response_carries_message() {
        let response = ApiError::Database("boom".to_string())
            .with_message("Error retrieving Tutorial with id=3")
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body, json!({ "message": "Error retrieving Tutorial with id=3" }));
    }

    #[test]
    fn test_with_message_keeps_validation_errors() {
        let err = ApiError::validation("after", "Invalid cursor").with_message("ignored");
        assert!(matches!(err, ApiError::Validation(ref errors) if errors[0].field == "after"));
    }

    #[test]
    fn test_or_message_fills_blank_database_errors() {
        let err = ApiError::Database(String::new()).or_message("fallback");
        assert!(matches!(err, ApiError::Database(ref m) if m == "fallback"));

        let err = ApiError::Database("kept".to_string()).or_message("fallback");
        assert!(matches!(err, ApiError::Database(ref m) if m == "kept"));
    }
}
