/// Error Handling Module
///
/// Every handler returns `AppError`. Each variant classifies into a status,
/// a stable code for clients and a message that is safe to show. Reasons for
/// refused credentials stay in the logs.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;

/// Postgres SQLSTATE for `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for `foreign_key_violation`
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Rejected request input. Each variant names the offending field.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
    SuspiciousContent(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is required", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} must be at least {} characters", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} must be at most {} characters", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} is not valid", field),
            ValidationError::SuspiciousContent(field) => {
                write!(f, "{} contains control characters", field)
            }
        }
    }
}

impl StdError for ValidationError {}

/// Storage failures, classified from `sqlx::Error`
#[derive(Debug)]
pub enum DatabaseError {
    /// A unique or foreign key constraint rejected the write
    Conflict(String),
    NotFound(String),
    /// Pool exhausted, closed or the server unreachable
    Unavailable(String),
    Query(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::Conflict(msg) => write!(f, "{}", msg),
            DatabaseError::NotFound(msg) => write!(f, "{}", msg),
            DatabaseError::Unavailable(msg) => write!(f, "database unavailable: {}", msg),
            DatabaseError::Query(msg) => write!(f, "query failed: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err)
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                DatabaseError::Conflict("Username or email already exists".to_string())
            }
            sqlx::Error::Database(db_err)
                if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) =>
            {
                DatabaseError::Conflict("Referenced record no longer exists".to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::Unavailable(err.to_string())
            }
            other => DatabaseError::Query(other.to_string()),
        }
    }
}

/// Refused credentials
///
/// Each variant is the only thing a client learns about a refused credential.
/// The concrete reason is logged where the check fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown username or wrong password
    InvalidCredentials,
    /// Missing, malformed, forged or expired access token
    Unauthorized,
    /// Any refresh token check failed
    CannotRefresh,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid username or password"),
            AuthError::Unauthorized => write!(f, "Unauthorized"),
            AuthError::CannotRefresh => write!(f, "Could not refresh token"),
        }
    }
}

impl StdError for AuthError {}

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Database(DatabaseError),
    Auth(AuthError),
    /// Signing, hashing or wiring failures. The message is logged, never sent.
    Internal(String),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::Database(DatabaseError::NotFound(what.into()))
    }

    /// Status, client-facing code and client-facing message.
    pub fn classify(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),
            AppError::Database(e) => match e {
                DatabaseError::Conflict(_) => (StatusCode::CONFLICT, "DUPLICATE_ENTRY", e.to_string()),
                DatabaseError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string()),
                DatabaseError::Unavailable(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service temporarily unavailable".to_string(),
                ),
                DatabaseError::Query(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error occurred".to_string(),
                ),
            },
            AppError::Auth(e) => {
                let code = match e {
                    AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
                    AuthError::Unauthorized => "UNAUTHORIZED",
                    AuthError::CannotRefresh => "REFRESH_DENIED",
                };
                (StatusCode::UNAUTHORIZED, code, e.to_string())
            }
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }

    fn log(&self, error_id: &str, status: StatusCode) {
        if status.is_server_error() {
            tracing::error!(error_id = error_id, error = %self, "Request failed");
        } else if status == StatusCode::NOT_FOUND {
            tracing::info!(error_id = error_id, error = %self, "Resource not found");
        } else {
            tracing::warn!(error_id = error_id, error = %self, "Request rejected");
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.into())
    }
}

/// JSON body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Also written to the log line for this failure
    pub error_id: String,
    pub message: String,
    pub code: &'static str,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn from_error(error: &AppError, error_id: String) -> Self {
        let (status, code, message) = error.classify();
        Self {
            error_id,
            message,
            code,
            status: status.as_u16(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        let status = self.status_code();
        self.log(&error_id, status);

        HttpResponse::build(status).json(ErrorResponse::from_error(self, error_id))
    }

    fn status_code(&self) -> StatusCode {
        self.classify().0
    }
}

/// Per-operation context carried into handler logs
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<i64>,
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
        }
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::EmptyField("email".to_string());
        assert_eq!(err.to_string(), "email is required");
    }

    #[test]
    fn test_app_error_conversion() {
        let app_err: AppError = ValidationError::InvalidFormat("role".to_string()).into();
        assert!(matches!(app_err, AppError::Validation(_)));
        assert_eq!(app_err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_row_not_found_maps_to_404() {
        let app_err: AppError = sqlx::Error::RowNotFound.into();
        assert_eq!(app_err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_pool_timeout_maps_to_503() {
        let app_err: AppError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(app_err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(app_err.classify().1, "SERVICE_UNAVAILABLE");
    }

    #[test]
    fn test_auth_errors_share_one_status() {
        for err in [
            AuthError::InvalidCredentials,
            AuthError::Unauthorized,
            AuthError::CannotRefresh,
        ] {
            assert_eq!(AppError::from(err).status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_refresh_denial_message_is_generic() {
        let body = ErrorResponse::from_error(&AppError::from(AuthError::CannotRefresh), "req-1".into());
        assert_eq!(body.status, 401);
        assert_eq!(body.code, "REFRESH_DENIED");
        assert_eq!(body.message, "Could not refresh token");
        assert_eq!(body.error_id, "req-1");
    }

    #[test]
    fn test_internal_error_hides_details() {
        let body = ErrorResponse::from_error(&AppError::Internal("secret detail".into()), "req-2".into());
        assert_eq!(body.message, "Internal server error");
        assert_eq!(body.status, 500);
    }

    #[test]
    fn test_error_context_creation() {
        let ctx = ErrorContext::new("position_creation");
        assert_eq!(ctx.operation, "position_creation");
        assert!(ctx.user_id.is_none());
        assert_eq!(ctx.with_user_id(7).user_id, Some(7));
    }
}
