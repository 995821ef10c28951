// Library crate for the wordserweb front end
// This file exposes the public API for integration tests

pub mod metrics;
pub mod routes;
pub mod session;
pub mod shared;
pub mod user;

// Re-export commonly used types for easier access in tests
pub use metrics::{MetricsRegistry, SessionMetrics};
pub use routes::build_router;
pub use session::{
    config::SessionConfig, keys::KeyMaterial, service::SessionService, store::InMemorySessionStore,
    AllowList, SessionError, UserContext,
};
pub use shared::{AppError, AppState};
pub use user::{InMemoryUserStore, UserStore, UserVerifier};
