use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::metrics;
use crate::session;
use crate::shared::AppState;
use crate::user;

/// Builds the application router.
///
/// Every route registered before the gate layer passes through
/// `session_gate`; allow-listed paths are waved through by the gate itself.
/// `/logout` sits outside the gate so a token about to expire is revoked
/// as presented rather than refreshed first.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(session::health))
        .route("/metrics", get(metrics::metrics))
        .route("/login", post(session::login))
        .route("/signup", post(user::signup))
        .route("/me", get(session::current_user))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::session_gate,
        ))
        .route("/logout", post(session::logout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
