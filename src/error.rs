use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::models::ComplaintStatus;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Authentication failed")]
    Unauthorized,

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Daily report limit of {limit} reached")]
    QuotaExceeded { limit: u32 },

    #[error("A similar report was already filed nearby")]
    DuplicateReport,

    #[error("Cannot move complaint from {from} to {to}")]
    InvalidTransition {
        from: ComplaintStatus,
        to: ComplaintStatus,
    },

    #[error("Points for this action were already recorded")]
    DuplicateLedgerEntry,

    #[error("Request deadline exceeded")]
    Timeout,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code returned alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Internal(_) => "internal",
            AppError::Unauthorized | AppError::Jwt(_) => "unauthorized",
            AppError::NotFound => "not_found",
            AppError::Forbidden => "forbidden",
            AppError::Validation(_) => "validation",
            AppError::QuotaExceeded { .. } => "quota_exceeded",
            AppError::DuplicateReport => "duplicate_report",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::DuplicateLedgerEntry => "duplicate_ledger_entry",
            AppError::Timeout => "timeout",
        }
    }

    /// Connection-level failures where the statement may never have reached the store.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Database(sea_orm::DbErr::Conn(_))
                | AppError::Database(sea_orm::DbErr::ConnectionAcquire(_))
        )
    }
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl utoipa::ToSchema for AppError {
    fn name() -> std::borrow::Cow<'static, str> {
        "ErrorResponse".into()
    }
}

impl utoipa::PartialSchema for AppError {
    fn schema() -> utoipa::openapi::RefOr<utoipa::openapi::schema::Schema> {
        ErrorResponse::schema()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, error_message) = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Jwt(e) => {
                tracing::error!("JWT error: {:?}", e);
                (StatusCode::UNAUTHORIZED, "Invalid token".to_string())
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            e @ AppError::QuotaExceeded { .. } => (StatusCode::TOO_MANY_REQUESTS, e.to_string()),
            e @ (AppError::DuplicateReport
            | AppError::InvalidTransition { .. }
            | AppError::DuplicateLedgerEntry) => (StatusCode::CONFLICT, e.to_string()),
            AppError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "Request deadline exceeded".to_string(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = json!({
            "error": error_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rejections_map_to_client_statuses() {
        let cases = [
            (AppError::QuotaExceeded { limit: 5 }, StatusCode::TOO_MANY_REQUESTS),
            (AppError::DuplicateReport, StatusCode::CONFLICT),
            (
                AppError::InvalidTransition {
                    from: ComplaintStatus::Resolved,
                    to: ComplaintStatus::Acknowledged,
                },
                StatusCode::CONFLICT,
            ),
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound, StatusCode::NOT_FOUND),
            (AppError::Timeout, StatusCode::GATEWAY_TIMEOUT),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn only_connection_errors_are_transient() {
        let conn = AppError::Database(sea_orm::DbErr::Conn(sea_orm::RuntimeErr::Internal(
            "reset".into(),
        )));
        assert!(conn.is_transient());
        assert!(!AppError::Database(sea_orm::DbErr::RecordNotFound("x".into())).is_transient());
        assert!(!AppError::DuplicateReport.is_transient());
    }

    #[test]
    fn invalid_transition_message_names_both_states() {
        let err = AppError::InvalidTransition {
            from: ComplaintStatus::Submitted,
            to: ComplaintStatus::Acknowledged,
        };
        assert_eq!(
            err.to_string(),
            "Cannot move complaint from submitted to acknowledged"
        );
    }
}
