use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::retry;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// One variant per stable error code. The HTTP mapping lives entirely in
/// `into_response`; handlers never pick status codes themselves.
#[derive(Debug)]
pub(crate) enum ApiError {
    BadRequest(String),
    Validation(String),
    Unauthorized(&'static str),
    InvalidToken(&'static str),
    TokenExpired,
    Forbidden(&'static str),
    NotFound(String),
    /// Serialization conflict after exhausted retries; the only retryable 409.
    Conflict(String),
    DuplicateEntry(String),
    InvalidOperation(String),
    #[allow(dead_code)]
    ResourceInUse(String),
    CapacityExceeded(String, Option<serde_json::Value>),
    ScheduleConflict(String),
    TooManyRequests(&'static str),
    DatabaseConnection(String),
    DatabaseQuery(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    /// Classify a database error: serialization failures become the
    /// retryable `Conflict`, unique violations `DuplicateEntry`, pool
    /// exhaustion a connection error; everything else a query error.
    pub(crate) fn db(err: sqlx::Error, context: &str) -> Self {
        if retry::is_serialization_failure(&err) {
            return Self::Conflict("Concurrent update detected, please retry".to_string());
        }
        if retry::is_unique_violation(&err) {
            return Self::DuplicateEntry("Resource already exists".to_string());
        }

        tracing::error!(error = %err, "{context}");
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::DatabaseConnection(context.to_string())
            }
            _ => Self::DatabaseQuery(context.to_string()),
        }
    }

    pub(crate) fn is_retryable_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict(_))
    }

    fn parts(self) -> (StatusCode, &'static str, String, Option<serde_json::Value>) {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", message, None)
            }
            ApiError::Validation(message) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message, None)
            }
            ApiError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message.to_string(), None)
            }
            ApiError::InvalidToken(message) => {
                (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", message.to_string(), None)
            }
            ApiError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_EXPIRED",
                "Session has expired".to_string(),
                None,
            ),
            ApiError::Forbidden(message) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", message.to_string(), None)
            }
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "CONFLICT", message, None),
            ApiError::DuplicateEntry(message) => {
                (StatusCode::CONFLICT, "DUPLICATE_ENTRY", message, None)
            }
            ApiError::InvalidOperation(message) => {
                (StatusCode::CONFLICT, "INVALID_OPERATION", message, None)
            }
            ApiError::ResourceInUse(message) => {
                (StatusCode::CONFLICT, "RESOURCE_IN_USE", message, None)
            }
            ApiError::CapacityExceeded(message, details) => {
                (StatusCode::CONFLICT, "CAPACITY_EXCEEDED", message, details)
            }
            ApiError::ScheduleConflict(message) => {
                (StatusCode::CONFLICT, "SCHEDULE_CONFLICT", message, None)
            }
            ApiError::TooManyRequests(message) => {
                (StatusCode::TOO_MANY_REQUESTS, "TOO_MANY_REQUESTS", message.to_string(), None)
            }
            ApiError::DatabaseConnection(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_CONNECTION_ERROR", message, None)
            }
            ApiError::DatabaseQuery(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_QUERY_ERROR", message, None)
            }
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message, None)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let unauthorized = matches!(
            self,
            ApiError::Unauthorized(_) | ApiError::InvalidToken(_) | ApiError::TokenExpired
        );
        let (status, code, message, details) = self.parts();

        let mut response =
            (status, Json(ErrorResponse { success: false, code, message, details }))
                .into_response();

        if unauthorized {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_expected_statuses() {
        let cases = [
            (ApiError::BadRequest("x".into()).parts().0, StatusCode::BAD_REQUEST),
            (ApiError::Validation("x".into()).parts().0, StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized("x").parts().0, StatusCode::UNAUTHORIZED),
            (ApiError::InvalidToken("x").parts().0, StatusCode::UNAUTHORIZED),
            (ApiError::TokenExpired.parts().0, StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden("x").parts().0, StatusCode::FORBIDDEN),
            (ApiError::NotFound("x".into()).parts().0, StatusCode::NOT_FOUND),
            (ApiError::Conflict("x".into()).parts().0, StatusCode::CONFLICT),
            (ApiError::DuplicateEntry("x".into()).parts().0, StatusCode::CONFLICT),
            (ApiError::InvalidOperation("x".into()).parts().0, StatusCode::CONFLICT),
            (ApiError::CapacityExceeded("x".into(), None).parts().0, StatusCode::CONFLICT),
            (ApiError::ScheduleConflict("x".into()).parts().0, StatusCode::CONFLICT),
            (ApiError::TooManyRequests("x").parts().0, StatusCode::TOO_MANY_REQUESTS),
            (ApiError::Internal("x".into()).parts().0, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (actual, expected) in cases {
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn only_plain_conflict_is_retryable() {
        assert!(ApiError::Conflict("x".into()).is_retryable_conflict());
        assert!(!ApiError::DuplicateEntry("x".into()).is_retryable_conflict());
        assert!(!ApiError::CapacityExceeded("x".into(), None).is_retryable_conflict());
        assert!(!ApiError::ScheduleConflict("x".into()).is_retryable_conflict());
    }
}
