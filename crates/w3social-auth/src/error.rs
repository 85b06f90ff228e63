/*
[INPUT]:  Failure conditions from every authentication component
[OUTPUT]: Typed error kinds callers can branch on deterministically
[POS]:    Error handling layer - unified error taxonomy for the crate
[UPDATE]: When adding a failure kind or changing how callers classify errors
*/

use thiserror::Error;

/// Every failure the authentication core can surface
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Malformed signature, non-recovering signature, or recovered address mismatch
    #[error("Invalid wallet signature")]
    InvalidSignature,

    /// Missing, expired, already consumed, or mismatched nonce
    #[error("Nonce is missing, expired, or already used")]
    NonceInvalid,

    /// Username already belongs to a different identity
    #[error("Username '{username}' is already taken")]
    UsernameTaken { username: String },

    /// No identity exists for the address
    #[error("No identity found for {address}")]
    NotFound { address: String },

    /// Session token expired, please re-authenticate
    #[error("Session token expired, please re-authenticate")]
    TokenExpired,

    /// Session token is forged or corrupted
    #[error("Session token is invalid")]
    TokenInvalid,

    /// Persistence collaborator failed
    #[error("Persistence failure: {message}")]
    Persistence { message: String },
}

impl AuthError {
    /// Stable snake_case code for transports
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::NonceInvalid => "nonce_invalid",
            AuthError::UsernameTaken { .. } => "username_taken",
            AuthError::NotFound { .. } => "not_found",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenInvalid => "token_invalid",
            AuthError::Persistence { .. } => "persistence",
        }
    }

    /// Check if the error is retryable by the transport layer
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::Persistence { .. })
    }

    /// Check if the caller should restart the challenge flow
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            AuthError::TokenExpired | AuthError::NonceInvalid | AuthError::InvalidSignature
        )
    }

    /// Create a persistence error from any displayable collaborator failure
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        AuthError::Persistence {
            message: err.to_string(),
        }
    }
}

/// Result type alias for authentication operations
pub type Result<T> = std::result::Result<T, AuthError>;
