use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{event, Level};
use uuid::Uuid;

/// Main error type for the bastion control plane
#[derive(Debug)]
pub enum ShrikeError {
    /// Configuration or CLI argument errors
    Config(String),

    /// Virtual device / kernel tunnel configuration errors
    Device(String),

    /// Address pool errors (exhaustion, bad block)
    AddressPool(String),

    /// Token verification errors
    Verify(VerifyError),

    /// API/HTTP related errors
    Api(String),

    /// System I/O errors
    Io(std::io::Error),
}

/// Token verification failures.
///
/// These mostly surface as the same external status code, but the categories
/// are kept distinct so audit logs stay actionable.
#[derive(Debug)]
pub enum VerifyError {
    /// Token structure could not be parsed
    Malformed(String),

    /// Token is signed with a symmetric algorithm, which is never trusted
    SymmetricAlgorithm(String),

    /// The token's key id is not present in the issuer's signing-key set
    UntrustedKey(String),

    /// Signature did not verify against the resolved key
    BadSignature,

    /// Time-claim window failures
    Expired { by_secs: i64 },
    NotYetValid,
    UsedBeforeIssued,

    /// Claim value failures
    IssuerMismatch { expected: String, found: String },
    TypeMismatch { expected: String, found: String },

    /// Discovery document or signing-key fetch failed
    Discovery(String),
}

impl fmt::Display for ShrikeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShrikeError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ShrikeError::Device(msg) => write!(f, "Device error: {}", msg),
            ShrikeError::AddressPool(msg) => write!(f, "Address pool error: {}", msg),
            ShrikeError::Verify(err) => write!(f, "Verification error: {}", err),
            ShrikeError::Api(msg) => write!(f, "API error: {}", msg),
            ShrikeError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::Malformed(msg) => write!(f, "malformed token: {}", msg),
            VerifyError::SymmetricAlgorithm(alg) => {
                write!(f, "symmetric signing algorithm {} is not allowed", alg)
            }
            VerifyError::UntrustedKey(kid) => {
                write!(f, "key id '{}' not found in signing-key set", kid)
            }
            VerifyError::BadSignature => write!(f, "signature verification failed"),
            VerifyError::Expired { by_secs } => write!(f, "token is expired by {}s", by_secs),
            VerifyError::NotYetValid => write!(f, "token is not valid yet"),
            VerifyError::UsedBeforeIssued => write!(f, "token used before issued"),
            VerifyError::IssuerMismatch { expected, found } => {
                write!(f, "issuer mismatch: expected '{}', got '{}'", expected, found)
            }
            VerifyError::TypeMismatch { expected, found } => write!(
                f,
                "token type mismatch: expected '{}', got '{}'",
                expected, found
            ),
            VerifyError::Discovery(msg) => write!(f, "discovery failed: {}", msg),
        }
    }
}

impl std::error::Error for ShrikeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShrikeError::Io(err) => Some(err),
            ShrikeError::Verify(err) => Some(err),
            _ => None,
        }
    }
}

impl std::error::Error for VerifyError {}

// Convenient type alias for Results using our error type
pub type Result<T> = std::result::Result<T, ShrikeError>;

impl ShrikeError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ShrikeError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ShrikeError::Device(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ShrikeError::AddressPool(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ShrikeError::Verify(_) => StatusCode::FORBIDDEN,
            ShrikeError::Api(_) => StatusCode::BAD_REQUEST,
            ShrikeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Conversions from common error types
impl From<std::io::Error> for ShrikeError {
    fn from(err: std::io::Error) -> Self {
        ShrikeError::Io(err)
    }
}

impl From<VerifyError> for ShrikeError {
    fn from(err: VerifyError) -> Self {
        ShrikeError::Verify(err)
    }
}

impl From<serde_json::Error> for ShrikeError {
    fn from(err: serde_json::Error) -> Self {
        ShrikeError::Api(err.to_string())
    }
}

impl From<reqwest::Error> for VerifyError {
    fn from(err: reqwest::Error) -> Self {
        VerifyError::Discovery(err.to_string())
    }
}

/// An HTTP rejection with an opaque correlation id.
///
/// The full detail is logged server-side only; the response body and the
/// `X-Error-ID` header carry just the id so failures can be matched against
/// the logs without leaking internals to the caller.
#[derive(Debug)]
pub struct ApiRejection {
    status: StatusCode,
    error_id: Uuid,
    detail: String,
}

impl ApiRejection {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            error_id: Uuid::new_v4(),
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, detail)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ShrikeError> for ApiRejection {
    fn from(err: ShrikeError) -> Self {
        Self::new(err.status_code(), err.to_string())
    }
}

impl IntoResponse for ApiRejection {
    fn into_response(self) -> Response {
        event!(
            Level::ERROR,
            error_id = %self.error_id,
            status = self.status.as_u16(),
            detail = %self.detail,
            "request rejected"
        );
        let body = json!({ "error_id": self.error_id.to_string() });
        (
            self.status,
            [("X-Error-ID", self.error_id.to_string())],
            Json(body),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_err = ShrikeError::Config("invalid CIDR".to_string());
        assert_eq!(config_err.to_string(), "Configuration error: invalid CIDR");

        let verify_err = ShrikeError::Verify(VerifyError::Expired { by_secs: 30 });
        assert!(verify_err.to_string().contains("expired by 30s"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ShrikeError::Verify(VerifyError::BadSignature).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ShrikeError::AddressPool("pool exhausted".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ShrikeError::Api("bad body".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_rejection_preserves_status() {
        let rejection: ApiRejection = ShrikeError::AddressPool("pool exhausted".to_string()).into();
        assert_eq!(rejection.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
