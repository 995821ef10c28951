use axum::{
    extract::{Request, State},
    http::{header::SET_COOKIE, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::{
    config::SESSION_COOKIE_NAME,
    cookie::{build_session_cookie, extract_cookie},
    gate::{gate, GateDecision},
    SessionError,
};
use crate::metrics::GateRejectionReason;
use crate::shared::{AppError, AppState};

/// Session cookie enforcement for every route it wraps.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), session::session_gate))
/// Handlers can then extract Extension(user): Extension<UserContext>.
#[instrument(skip(state, req, next), fields(path = %req.uri().path()))]
pub async fn session_gate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path().to_owned();
    let credential = extract_cookie(req.headers(), SESSION_COOKIE_NAME);

    let decision = gate(
        &path,
        credential.as_deref(),
        &state.allow_list,
        &state.session_service,
    )
    .await
    .map_err(|e| {
        warn!(error = %e, "Request rejected by session gate");
        let metrics = state.session_service.metrics();
        match e {
            SessionError::CredentialMissing => {
                metrics.record_gate_rejection(GateRejectionReason::NoCredentials);
                AppError::no_credentials()
            }
            _ => {
                metrics.record_gate_rejection(GateRejectionReason::InvalidCredentials);
                AppError::invalid_credentials()
            }
        }
    })?;

    let (principal, rotated_token) = match decision {
        GateDecision::Bypass => return Ok(next.run(req).await),
        GateDecision::Forward {
            principal,
            rotated_token,
        } => (principal, rotated_token),
    };

    debug!(username = %principal.username, "Session accepted, adding user to request");
    req.extensions_mut().insert(principal);

    let mut response = next.run(req).await;

    if let Some(token) = rotated_token {
        let cookie = build_session_cookie(&token, state.config.cookie_max_age, Utc::now());
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
                info!("Replaced session cookie after refresh");
            }
            Err(e) => warn!(error = %e, "Refreshed token is not a valid header value"),
        }
    }

    Ok(response)
}
