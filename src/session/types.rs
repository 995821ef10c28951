use serde::{Deserialize, Serialize};

/// The authenticated principal carried inside every token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserContext {
    pub username: String,
}

impl UserContext {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// JWT claims structure containing session information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    pub user_context: UserContext,
    pub sub: String,
    pub iss: String,
    pub aud: Vec<String>,
    pub jti: String, // Session id, key into the session store
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

/// A freshly signed token together with the session it is bound to
#[derive(Debug, Clone, PartialEq)]
pub struct MintedToken {
    pub token: String,
    pub session_id: String,
    pub expires_at: i64,
}

/// Outcome of a successful validation.
///
/// `token` and `session_id` are the presented ones unless a refresh rotated
/// the session, in which case they belong to the replacement.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSession {
    pub token: String,
    pub session_id: String,
    pub user_context: UserContext,
    pub rotated: bool,
}

/// Request body for the login and signup endpoints
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// Response body for a successful login
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct LoginResponse {
    pub username: String,
}
