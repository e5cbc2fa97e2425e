use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by handlers. The `Display` text is the stable message
/// returned to the caller in `{"error": ...}`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing, malformed, expired or revoked credential
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed to act on the resource
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Malformed request or illegal status transition
    #[error("{0}")]
    InvalidInput(String),

    /// A business rule (geofence, working hours, face match) refused the request
    #[error("{0}")]
    ValidationFailed(String),

    /// The record changed between read and write
    #[error("{0}")]
    Conflict(String),

    /// Storage or service failure. The cause is logged, never returned.
    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        AppError::ValidationFailed(msg.into())
    }

    pub fn internal(cause: impl ToString) -> Self {
        AppError::Internal(cause.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Database error");
        AppError::Internal(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        tracing::error!(error = %e, "Stored JSON could not be decoded");
        AppError::Internal(e.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// True when a sqlx error is a unique-key violation (ER_DUP_ENTRY / ER_DUP_KEY).
/// Other integrity errors sharing SQLSTATE 23000 (foreign key, NOT NULL) are not.
pub fn is_duplicate_key(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}


#[cfg(test)]
mod tests {
    use super::testing::db_error;
    use super::*;
    use actix_web::body::to_bytes;
    use sqlx::error::ErrorKind;

    #[test]
    fn status_classes_follow_the_taxonomy() {
        assert_eq!(AppError::unauthorized("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::invalid("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::rejected("x").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn internal_errors_hide_their_cause() {
        let resp = AppError::internal("connection refused on 10.0.0.3").error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Internal server error");
    }

    #[actix_web::test]
    async fn client_errors_carry_their_message() {
        let resp = AppError::invalid("Already clocked in today").error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Already clocked in today");
    }

    #[test]
    fn non_database_errors_are_not_duplicates() {
        assert!(!is_duplicate_key(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn unique_violation_is_a_duplicate() {
        assert!(is_duplicate_key(&db_error("23000", ErrorKind::UniqueViolation)));
    }

    #[test]
    fn other_integrity_violations_are_not_duplicates() {
        assert!(!is_duplicate_key(&db_error("23000", ErrorKind::ForeignKeyViolation)));
        assert!(!is_duplicate_key(&db_error("23000", ErrorKind::NotNullViolation)));
    }
}
