use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use password_hash::{PasswordHash, SaltString};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Checks a username/password pair against the account store
#[async_trait]
pub trait UserVerifier: Send + Sync {
    async fn is_user_account_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, UserStoreError>;
}

/// Account creation and lookup
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user_account(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserAccount, UserStoreError>;

    async fn get_user_account(&self, username: &str) -> Result<Option<UserAccount>, UserStoreError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UserStoreError {
    #[error("Account already exists: {username}")]
    AlreadyExists { username: String },

    #[error("Invalid account data: {0}")]
    Invalid(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("User store unavailable: {0}")]
    Unavailable(String),
}

/// Accepted password length, in characters
pub const MIN_PASSWORD_LEN: usize = 3;
pub const MAX_PASSWORD_LEN: usize = 60;

/// Rejects account data no store should accept
pub fn validate_new_account(username: &str, password: &str) -> Result<(), UserStoreError> {
    if username.trim().is_empty() {
        return Err(UserStoreError::Invalid("username is empty".to_string()));
    }
    let password_len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password_len) {
        return Err(UserStoreError::Invalid(format!(
            "password must be between {} and {} characters",
            MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
        )));
    }
    Ok(())
}

struct StoredAccount {
    account: UserAccount,
    password_hash: String,
}

/// In-memory implementation of UserStore and UserVerifier.
/// Passwords are kept only as argon2 PHC strings.
pub struct InMemoryUserStore {
    accounts: RwLock<HashMap<String, StoredAccount>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
        }
    }

    fn hash_password(password: &str) -> Result<String, UserStoreError> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes)
            .map_err(|e| UserStoreError::Hashing(e.to_string()))?;
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|e| UserStoreError::Hashing(e.to_string()))?;

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|phc| phc.to_string())
            .map_err(|e| UserStoreError::Hashing(e.to_string()))
    }

    fn verify_password(hash: &str, password: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    #[instrument(skip(self, password))]
    async fn create_user_account(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserAccount, UserStoreError> {
        validate_new_account(username, password)?;

        // Hash outside the lock, it is the slow part
        let password_hash = Self::hash_password(password)?;

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(username) {
            warn!(username = %username, "Account already exists");
            return Err(UserStoreError::AlreadyExists {
                username: username.to_string(),
            });
        }

        let account = UserAccount {
            username: username.to_string(),
            created_at: Utc::now(),
        };
        accounts.insert(
            username.to_string(),
            StoredAccount {
                account: account.clone(),
                password_hash,
            },
        );

        info!(username = %username, "Created user account");
        Ok(account)
    }

    async fn get_user_account(&self, username: &str) -> Result<Option<UserAccount>, UserStoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(username).map(|stored| stored.account.clone()))
    }
}

#[async_trait]
impl UserVerifier for InMemoryUserStore {
    #[instrument(skip(self, password))]
    async fn is_user_account_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, UserStoreError> {
        let password_hash = {
            let accounts = self.accounts.read().await;
            accounts.get(username).map(|stored| stored.password_hash.clone())
        };

        let verified = match password_hash {
            Some(hash) => Self::verify_password(&hash, password),
            None => false,
        };

        debug!(username = %username, verified = verified, "Checked account password");
        Ok(verified)
    }
}
