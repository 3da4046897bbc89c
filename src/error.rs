use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// The presented verification code is not known at all.
    #[error("Invalid verification code")]
    InvalidCode,

    /// The presented verification code exists but is expired or rotated out.
    #[error("Verification code expired or inactive")]
    CodeExpiredOrInactive,

    /// An attendance record already exists for this user and period.
    #[error("Attendance already recorded for this period")]
    AlreadyCheckedIn,

    /// The attendance record for this period is already closed.
    #[error("Attendance already checked out for this period")]
    AlreadyCheckedOut,

    /// Login failed. Deliberately identical for unknown email and bad password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The account exists but has been deactivated.
    #[error("Account is inactive")]
    InactiveAccount,

    /// A token failed signature, expiry, issuer or shape checks.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// A well-formed refresh token that was never issued by us.
    #[error("Refresh token not found")]
    RefreshTokenNotFound,

    /// A refresh token that was already rotated or logged out.
    #[error("Refresh token revoked")]
    RefreshTokenRevoked,

    /// An authorization error.
    #[error("Forbidden")]
    Forbidden,

    /// A resource not found error.
    #[error("Resource not found")]
    NotFound,

    /// A uniqueness conflict (duplicate email, department name, ...).
    #[error("{0}")]
    Conflict(String),

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection pool error.
    #[error("Connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A row came back without an expected column.
    #[error("Missing or malformed column: {0}")]
    MissingData(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<garde::Report> for AppError {
    fn from(report: garde::Report) -> Self {
        AppError::Validation(report.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidCode => {
                tracing::debug!("Rejected verification code: unknown token");
                (StatusCode::BAD_REQUEST, self.to_string())
            }

            AppError::CodeExpiredOrInactive => {
                tracing::debug!("Rejected verification code: expired or inactive");
                (StatusCode::BAD_REQUEST, self.to_string())
            }

            AppError::AlreadyCheckedIn => {
                tracing::debug!("Duplicate check-in rejected");
                (StatusCode::CONFLICT, self.to_string())
            }

            AppError::AlreadyCheckedOut => {
                tracing::debug!("Duplicate check-out rejected");
                (StatusCode::CONFLICT, self.to_string())
            }

            AppError::InvalidCredentials => {
                tracing::warn!("Login failed");
                (StatusCode::UNAUTHORIZED, self.to_string())
            }

            AppError::InactiveAccount => {
                tracing::warn!("Login attempt on inactive account");
                (StatusCode::FORBIDDEN, self.to_string())
            }

            AppError::InvalidToken => {
                tracing::warn!("Token rejected");
                (StatusCode::UNAUTHORIZED, self.to_string())
            }

            AppError::RefreshTokenNotFound => {
                tracing::warn!("Unknown refresh token presented");
                (StatusCode::UNAUTHORIZED, self.to_string())
            }

            AppError::RefreshTokenRevoked => {
                tracing::warn!("Revoked refresh token presented");
                (StatusCode::UNAUTHORIZED, self.to_string())
            }

            AppError::Forbidden => {
                tracing::warn!("Authorization failed");
                (StatusCode::FORBIDDEN, self.to_string())
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                (StatusCode::NOT_FOUND, self.to_string())
            }

            AppError::Conflict(ref msg) => {
                tracing::debug!("Conflict: {}", msg);
                (StatusCode::CONFLICT, msg.clone())
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, "Storage unavailable".to_string())
            }

            AppError::Pool(ref e) => {
                tracing::error!("Connection pool error: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, "Storage unavailable".to_string())
            }

            AppError::MissingData(ref col) => {
                tracing::error!("Missing or malformed column: {}", col);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, body).into_response()
    }
}
