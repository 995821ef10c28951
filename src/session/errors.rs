use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use thiserror::Error;

/// Every way the session subsystem can fail.
///
/// Internal callers match on the specific kind; the request gate collapses
/// all of them into a single unauthorized response.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Failed to load key material: {0}")]
    KeyLoad(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Session store error: {0}")]
    Store(String),

    #[error("Malformed token: {0}")]
    TokenMalformed(String),

    #[error("Token signature is invalid")]
    TokenInvalidSignature,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token is not valid yet")]
    TokenNotYetValid,

    #[error("Session not found or has been revoked")]
    SessionRevoked,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("No credentials presented")]
    CredentialMissing,

    #[error("User verification failed: {0}")]
    UserVerification(String),

    #[error("Invalid session configuration: {0}")]
    Config(String),
}

impl SessionError {
    /// True for failures caused by the presented token or its session,
    /// as opposed to infrastructure failures on our side.
    pub fn is_credential_rejection(&self) -> bool {
        matches!(
            self,
            SessionError::TokenMalformed(_)
                | SessionError::TokenInvalidSignature
                | SessionError::TokenExpired
                | SessionError::TokenNotYetValid
                | SessionError::SessionRevoked
                | SessionError::CredentialMissing
        )
    }
}

impl From<JwtError> for SessionError {
    fn from(e: JwtError) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => SessionError::TokenExpired,
            ErrorKind::ImmatureSignature => SessionError::TokenNotYetValid,
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::InvalidKeyFormat => SessionError::TokenInvalidSignature,
            _ => SessionError::TokenMalformed(e.to_string()),
        }
    }
}
