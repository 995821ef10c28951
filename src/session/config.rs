use chrono::Duration;
use std::path::PathBuf;
use tracing::warn;

use super::errors::SessionError;

pub const DEFAULT_PUB_KEY_PATH: &str = "/etc/wordserweb/keys/pub.rsa.pem";
pub const DEFAULT_PRIV_KEY_PATH: &str = "/etc/wordserweb/keys/priv.rsa.pem";

/// Value used for both the `iss` and `aud` claims
pub const TOKEN_ISSUER: &str = "wordserweb";

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE_NAME: &str = "session_token";

/// Upper bound on the token lifetime, one year
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;

/// Upper bound on the cookie max age; browsers cap it at 400 days anyway
pub const MAX_COOKIE_MAX_AGE_SECS: i64 = 400 * 24 * 60 * 60;

/// Configuration for the session subsystem.
///
/// Token lifetime, refresh window and cookie max age are independent knobs:
/// the cookie max age is only a hint to the browser and does not bound the
/// token, which is rotated by the gate once it enters the refresh window.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub pub_key_path: PathBuf,
    pub priv_key_path: PathBuf,
    pub token_lifetime: Duration,
    pub refresh_window: Duration,
    pub cookie_max_age: Duration,
    pub sweep_interval: Duration,
    pub issuer: String,
    pub audience: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pub_key_path: PathBuf::from(DEFAULT_PUB_KEY_PATH),
            priv_key_path: PathBuf::from(DEFAULT_PRIV_KEY_PATH),
            token_lifetime: Duration::hours(24),
            refresh_window: Duration::minutes(5),
            cookie_max_age: Duration::minutes(60),
            sweep_interval: Duration::minutes(15),
            issuer: TOKEN_ISSUER.to_string(),
            audience: TOKEN_ISSUER.to_string(),
        }
    }
}

impl SessionConfig {
    /// Reads configuration from the environment, falling back to defaults
    pub fn from_env() -> Result<Self, SessionError> {
        let defaults = Self::default();

        let config = Self {
            pub_key_path: std::env::var("JWT_PUB_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.pub_key_path),
            priv_key_path: std::env::var("JWT_PRIV_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.priv_key_path),
            token_lifetime: seconds_from_env("SESSION_TOKEN_LIFETIME_SECS")
                .unwrap_or(defaults.token_lifetime),
            refresh_window: seconds_from_env("SESSION_REFRESH_WINDOW_SECS")
                .unwrap_or(defaults.refresh_window),
            cookie_max_age: seconds_from_env("SESSION_COOKIE_MAX_AGE_SECS")
                .unwrap_or(defaults.cookie_max_age),
            sweep_interval: seconds_from_env("SESSION_SWEEP_INTERVAL_SECS")
                .unwrap_or(defaults.sweep_interval),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }

    pub fn with_key_paths(
        mut self,
        pub_key_path: impl Into<PathBuf>,
        priv_key_path: impl Into<PathBuf>,
    ) -> Self {
        self.pub_key_path = pub_key_path.into();
        self.priv_key_path = priv_key_path.into();
        self
    }

    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    pub fn with_refresh_window(mut self, window: Duration) -> Self {
        self.refresh_window = window;
        self
    }

    pub fn with_cookie_max_age(mut self, max_age: Duration) -> Self {
        self.cookie_max_age = max_age;
        self
    }

    /// Rejects values the session subsystem cannot work with
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.token_lifetime <= Duration::zero() {
            return Err(SessionError::Config(
                "token lifetime must be positive".to_string(),
            ));
        }
        if self.token_lifetime.num_seconds() > MAX_TOKEN_LIFETIME_SECS {
            return Err(SessionError::Config(format!(
                "token lifetime ({}s) exceeds the maximum of {}s",
                self.token_lifetime.num_seconds(),
                MAX_TOKEN_LIFETIME_SECS
            )));
        }
        if self.refresh_window < Duration::zero() {
            return Err(SessionError::Config(
                "refresh window must not be negative".to_string(),
            ));
        }
        if self.refresh_window >= self.token_lifetime {
            return Err(SessionError::Config(format!(
                "refresh window ({}s) must be shorter than token lifetime ({}s)",
                self.refresh_window.num_seconds(),
                self.token_lifetime.num_seconds()
            )));
        }
        if self.cookie_max_age <= Duration::zero() {
            return Err(SessionError::Config(
                "cookie max age must be positive".to_string(),
            ));
        }
        if self.cookie_max_age.num_seconds() > MAX_COOKIE_MAX_AGE_SECS {
            return Err(SessionError::Config(format!(
                "cookie max age ({}s) exceeds the maximum of {}s",
                self.cookie_max_age.num_seconds(),
                MAX_COOKIE_MAX_AGE_SECS
            )));
        }
        if self.sweep_interval <= Duration::zero() {
            return Err(SessionError::Config(
                "sweep interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn seconds_from_env(name: &str) -> Option<Duration> {
    let raw = std::env::var(name).ok()?;
    parse_seconds(name, &raw)
}

fn parse_seconds(name: &str, raw: &str) -> Option<Duration> {
    match raw.trim().parse::<i64>() {
        Ok(secs) => match Duration::try_seconds(secs) {
            Some(duration) => Some(duration),
            None => {
                warn!(variable = name, value = %raw, "Ignoring out of range duration, using default");
                None
            }
        },
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparsable duration, using default");
            None
        }
    }
}
