//! Error types for artisan-auth
//!
//! Every variant has a uniform client-facing message. Internal detail
//! (why a token was rejected, what was wrong with a stored field, the text
//! of a store failure) is for logs only and never reaches a response body.

use hyper::StatusCode;
use serde::Serialize;
use std::fmt;

/// Why a valid identity was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    /// Account record missing or not active. Both cases share one reason so
    /// the response cannot be used to probe which accounts exist.
    AccountUnavailable,
    /// None of the caller's roles is in the required set
    InsufficientRole,
    /// The resource belongs to another account
    NotOwner,
}

impl ForbiddenReason {
    pub fn code(&self) -> &'static str {
        match self {
            ForbiddenReason::AccountUnavailable => "ACCOUNT_UNAVAILABLE",
            ForbiddenReason::InsufficientRole => "INSUFFICIENT_ROLE",
            ForbiddenReason::NotOwner => "NOT_OWNER",
        }
    }
}

impl fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForbiddenReason::AccountUnavailable => write!(f, "account inactive or not found"),
            ForbiddenReason::InsufficientRole => write!(f, "insufficient permissions"),
            ForbiddenReason::NotOwner => write!(f, "resource belongs to another account"),
        }
    }
}

/// Main error type for artisan-auth operations
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Fatal misconfiguration. The process must not start.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing, malformed, forged or expired token
    #[error("Authentication required")]
    Unauthenticated,

    /// Login with an unknown identifier or a wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden: {0}")]
    Forbidden(ForbiddenReason),

    /// A stored encrypted field could not be decoded or decrypted
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Registration for an email or phone number already in use
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The external user store failed or timed out
    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body returned to clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl AuthError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::DataIntegrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the response body
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "SERVER_ERROR",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Forbidden(reason) => reason.code(),
            Self::DataIntegrity(_) => "SERVER_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Conflict(_) => "CONFLICT",
            Self::Store(_) => "SERVICE_UNAVAILABLE",
            Self::Internal(_) => "SERVER_ERROR",
        }
    }

    /// Message safe to show a client.
    ///
    /// Bad requests echo their validation message, which only describes the
    /// caller's own input. Everything else is a fixed string.
    pub fn public_message(&self) -> String {
        match self {
            Self::Unauthenticated => "Invalid or missing authentication token".into(),
            Self::InvalidCredentials => "Invalid credentials".into(),
            Self::Forbidden(ForbiddenReason::AccountUnavailable) => {
                "User account is inactive or not found".into()
            }
            Self::Forbidden(ForbiddenReason::InsufficientRole) => {
                "Access denied. Insufficient permissions".into()
            }
            Self::Forbidden(ForbiddenReason::NotOwner) => {
                "Access denied. This resource does not belong to you".into()
            }
            Self::BadRequest(msg) => msg.clone(),
            Self::Conflict(_) => "A user with this email or phone number already exists".into(),
            Self::Store(_) => "Service temporarily unavailable".into(),
            Self::Config(_) | Self::DataIntegrity(_) | Self::Internal(_) => {
                "Internal server error".into()
            }
        }
    }

    /// Convert to status code and JSON body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.public_message(),
            code: Some(self.code().to_string()),
        };
        let body = serde_json::to_string(&body)
            .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());
        (status, body)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<tokio::time::error::Elapsed> for AuthError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Store("account lookup timed out".into())
    }
}

/// Result type alias for artisan-auth operations
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::Forbidden(ForbiddenReason::InsufficientRole).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::DataIntegrity("bad iv".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::Store("down".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_body_hides_internal_detail() {
        let (status, body) =
            AuthError::DataIntegrity("iv 'deadbeef' has wrong length".into())
                .into_status_code_and_body();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("deadbeef"));
        assert!(body.contains("Internal server error"));

        let (_, body) = AuthError::Store("connection refused 10.0.0.3".into())
            .into_status_code_and_body();
        assert!(!body.contains("10.0.0.3"));
    }

    #[test]
    fn test_account_missing_and_inactive_share_message() {
        let body = AuthError::Forbidden(ForbiddenReason::AccountUnavailable).public_message();
        assert_eq!(body, "User account is inactive or not found");
    }

    #[test]
    fn test_only_config_is_fatal() {
        assert!(AuthError::Config("missing key".into()).is_fatal());
        assert!(!AuthError::Unauthenticated.is_fatal());
        assert!(!AuthError::DataIntegrity("x".into()).is_fatal());
    }
}
