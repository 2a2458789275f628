//! Unified error handling for admin.
//!
//! Every handler returns [`Result<T>`]. Errors render as JSON: validation
//! failures as `{ validationFailed, fieldErrors }`, everything else as
//! `{ error }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use smartcartify_core::FieldErrors;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::RuleError;
use crate::shopify::AdminShopifyError;

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] AdminShopifyError),

    /// Submitted rules failed validation.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Shop is not installed or the request is not signed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RuleError> for AppError {
    fn from(e: RuleError) -> Self {
        match e {
            RuleError::Validation(errors) => Self::Validation(errors),
            RuleError::MissingToken(shop) => {
                Self::Unauthorized(format!("{shop} has not installed the app"))
            }
            RuleError::NotFound => Self::NotFound("rule".to_string()),
            RuleError::Repository(e) => Self::Database(e),
            RuleError::Encode(e) => Self::Internal(e.to_string()),
        }
    }
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Shopify(_) => StatusCode::BAD_GATEWAY,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::Shopify(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let body = match self {
            Self::Validation(errors) => json!({
                "validationFailed": true,
                "fieldErrors": errors,
            }),
            Self::Database(e) => json!({ "error": persistence_message(&e) }),
            Self::Internal(_) => json!({ "error": "Internal server error" }),
            Self::Shopify(_) => json!({ "error": "External service error" }),
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Client-safe description of a persistence failure.
///
/// Postgres server messages (constraint and check violations) are passed on.
/// Connection, pool and driver errors are reduced to their kind so hosts and
/// credentials never reach the client.
fn persistence_message(error: &RepositoryError) -> String {
    let detail = match error {
        RepositoryError::Database(sqlx::Error::Database(db)) => db.message().to_string(),
        RepositoryError::Database(
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_),
        ) => "database unavailable".to_string(),
        RepositoryError::Database(sqlx::Error::RowNotFound) | RepositoryError::NotFound => {
            "row not found".to_string()
        }
        RepositoryError::Database(_) => "database error".to_string(),
        RepositoryError::DataCorruption(m) => format!("stored data is invalid: {m}"),
    };
    format!("Failed to save: {detail}")
}

/// Result type alias for admin handlers.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("rule".to_string());
        assert_eq!(err.to_string(), "Not found: rule");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_rule_errors_map_to_status_codes() {
        let status = |e: RuleError| AppError::from(e).into_response().status();

        assert_eq!(
            status(RuleError::Validation(FieldErrors::default())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(RuleError::MissingToken("a.myshopify.com".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status(RuleError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status(RuleError::Repository(RepositoryError::DataCorruption(
                "bad row".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_validation_body_lists_field_errors() {
        let mut errors = FieldErrors::default();
        errors.insert(0, "value", "must be greater than zero");

        let body = body_json(AppError::Validation(errors).into_response()).await;
        assert_eq!(body["validationFailed"], true);
        assert_eq!(body["fieldErrors"]["0.value"], "must be greater than zero");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let response = AppError::Internal("connection reset".to_string()).into_response();
        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_persistence_failure_carries_sanitized_message() {
        let response =
            AppError::Database(RepositoryError::DataCorruption("rule 4 has no id".to_string()))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            "Failed to save: stored data is invalid: rule 4 has no id"
        );

        let body = body_json(
            AppError::Database(RepositoryError::Database(sqlx::Error::PoolTimedOut))
                .into_response(),
        )
        .await;
        assert_eq!(body["error"], "Failed to save: database unavailable");
    }
}
