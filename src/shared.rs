use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use crate::metrics::MetricsRegistry;
use crate::session::{config::SessionConfig, gate::AllowList, service::SessionService, SessionError};
use crate::user::{UserStore, UserStoreError};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub session_service: Arc<SessionService>,
    pub user_store: Arc<dyn UserStore>,
    pub allow_list: Arc<AllowList>,
    pub config: Arc<SessionConfig>,
    pub metrics: Arc<MetricsRegistry>,
}

impl AppState {
    pub fn new(
        session_service: Arc<SessionService>,
        user_store: Arc<dyn UserStore>,
        allow_list: AllowList,
        config: SessionConfig,
    ) -> Self {
        let metrics = Arc::new(MetricsRegistry::new(session_service.metrics().clone()));
        Self {
            session_service,
            user_store,
            allow_list: Arc::new(allow_list),
            config: Arc::new(config),
            metrics,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// The generic rejection used by the request gate, which never says
    /// which check failed
    pub fn invalid_credentials() -> Self {
        AppError::Unauthorized("invalid credentials".to_string())
    }

    pub fn no_credentials() -> Self {
        AppError::Unauthorized("no credentials".to_string())
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::CredentialMissing => AppError::no_credentials(),
            SessionError::InvalidCredentials => {
                AppError::Unauthorized("invalid username or password".to_string())
            }
            e if e.is_credential_rejection() => AppError::invalid_credentials(),
            e => {
                error!(error = %e, "Session subsystem failure");
                AppError::Internal
            }
        }
    }
}

impl From<UserStoreError> for AppError {
    fn from(e: UserStoreError) -> Self {
        match e {
            UserStoreError::AlreadyExists { .. } => {
                AppError::Conflict("username is not available".to_string())
            }
            UserStoreError::Invalid(msg) => AppError::BadRequest(msg),
            e => {
                error!(error = %e, "User store failure");
                AppError::Internal
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
