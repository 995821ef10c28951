use axum::Router;
use std::sync::Arc;

use wordserweb::session::token::TokenMinter;
use wordserweb::{
    build_router, AllowList, AppState, InMemoryUserStore, KeyMaterial, SessionConfig,
    SessionService, UserStore,
};

use super::mocks::{CountingSessionStore, ManualClock, SequentialIdGenerator};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub const PUB_KEY_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/keys/pub.rsa.pem");
pub const PRIV_KEY_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/keys/priv.rsa.pem");

pub struct TestSetup {
    pub service: Arc<SessionService>,
    pub store: Arc<CountingSessionStore>,
    pub users: Arc<InMemoryUserStore>,
    pub clock: Arc<ManualClock>,
    pub config: SessionConfig,
}

impl TestSetup {
    /// Router wired to this setup's service and stores
    pub fn router(&self) -> Router {
        build_router(AppState::new(
            self.service.clone(),
            self.users.clone(),
            AllowList::default(),
            self.config.clone(),
        ))
    }
}

pub struct TestSetupBuilder {
    users: Vec<(String, String)>,
    config: SessionConfig,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            users: vec![],
            config: SessionConfig::default().with_key_paths(PUB_KEY_PATH, PRIV_KEY_PATH),
        }
    }

    pub fn with_user(mut self, username: &str, password: &str) -> Self {
        self.users.push((username.to_string(), password.to_string()));
        self
    }

    pub fn with_alice(self) -> Self {
        self.with_user("alice", "correct horse battery staple")
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config.with_key_paths(PUB_KEY_PATH, PRIV_KEY_PATH);
        self
    }

    pub async fn build(self) -> TestSetup {
        let keys = KeyMaterial::load(&self.config.pub_key_path, &self.config.priv_key_path)
            .expect("fixture keys must load");

        let store = Arc::new(CountingSessionStore::new());
        let users = Arc::new(InMemoryUserStore::new());
        for (username, password) in &self.users {
            users.create_user_account(username, password).await.unwrap();
        }

        let clock = Arc::new(ManualClock::new());
        let minter = TokenMinter::new(
            keys,
            store.clone(),
            Arc::new(SequentialIdGenerator::new()),
            clock.clone(),
            &self.config,
        );
        let service = Arc::new(SessionService::new(
            minter,
            store.clone(),
            users.clone(),
            &self.config,
        ));

        TestSetup {
            service,
            store,
            users,
            clock,
            config: self.config,
        }
    }
}
