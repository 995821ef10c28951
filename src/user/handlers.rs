use axum::{
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument, warn};

use super::store::UserStoreError;
use crate::session::build_session_cookie;
use crate::session::types::CredentialsRequest;
use crate::shared::{AppError, AppState};

/// HTTP handler for creating an account
///
/// POST /signup
/// Creates the account and logs the new user in: returns 201 with the
/// username and sets the session cookie
#[instrument(name = "signup", skip(state, request), fields(username = %request.username))]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Taken names are refused before paying for a password hash
    if state
        .user_store
        .get_user_account(&request.username)
        .await?
        .is_some()
    {
        warn!("Username already taken");
        return Err(UserStoreError::AlreadyExists {
            username: request.username,
        }
        .into());
    }

    let account = state
        .user_store
        .create_user_account(&request.username, &request.password)
        .await?;
    info!("Account created");

    let minted = state
        .session_service
        .login(&account.username, &request.password)
        .await?;

    let cookie = build_session_cookie(&minted.token, state.config.cookie_max_age, Utc::now());
    info!(session_id = %minted.session_id, "New account logged in");

    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie)],
        Json(json!({ "username": account.username })),
    ))
}
