// Public API - what other modules can use
pub use errors::SessionError;
pub use gate::{gate, AllowList, GateDecision};
pub use handlers::{current_user, health, login, logout};
pub use middleware::session_gate;
pub use types::{SessionClaims, UserContext};

// Internal modules
pub mod cleanup_task;
pub mod config;
mod cookie;
pub mod errors;
pub mod gate;
pub mod generators;
mod handlers;
pub mod keys;
mod middleware;
pub mod service;
pub mod store;
pub mod token;
pub mod types;

pub use cookie::{build_clear_cookie, build_session_cookie, extract_cookie};
