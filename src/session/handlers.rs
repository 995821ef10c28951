use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use tracing::{info, instrument, warn};

use super::{
    config::SESSION_COOKIE_NAME,
    cookie::{build_clear_cookie, build_session_cookie, extract_cookie},
    types::{CredentialsRequest, LoginResponse, UserContext},
    SessionError,
};
use crate::shared::{AppError, AppState};

/// HTTP handler for logging in
///
/// POST /login
/// Sets the session cookie on success
#[instrument(name = "login", skip(state, request), fields(username = %request.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let minted = state
        .session_service
        .login(&request.username, &request.password)
        .await?;

    let cookie = build_session_cookie(&minted.token, state.config.cookie_max_age, Utc::now());
    info!(session_id = %minted.session_id, "Session cookie issued");

    Ok((
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            username: request.username,
        }),
    ))
}

/// HTTP handler for logging out
///
/// POST /logout
/// Revokes the session named by the cookie and clears it. Mounted outside the
/// session gate, the token is validated here without refreshing it.
#[instrument(name = "logout", skip(state, headers))]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let token = extract_cookie(&headers, SESSION_COOKIE_NAME)
        .ok_or(SessionError::CredentialMissing)?;

    state.session_service.logout(&token).await.map_err(|e| {
        warn!(error = %e, "Logout rejected");
        AppError::from(e)
    })?;

    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, build_clear_cookie())]))
}

/// GET /me
/// Returns the user the session gate authenticated
pub async fn current_user(Extension(user): Extension<UserContext>) -> Json<UserContext> {
    Json(user)
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
