// Public API - what other modules can use
pub use handlers::signup;
pub use store::{
    InMemoryUserStore, UserAccount, UserStore, UserStoreError, UserVerifier,
};

mod handlers;
pub mod store;
