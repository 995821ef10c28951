use chrono::Duration;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::{
    config::SessionConfig,
    errors::SessionError,
    generators::{Clock, SystemClock, UuidSessionIdGenerator},
    keys::KeyMaterial,
    store::SessionStore,
    token::TokenMinter,
    types::{MintedToken, UserContext, ValidatedSession},
};
use crate::metrics::SessionMetrics;
use crate::user::UserVerifier;

/// Login, validation with sliding refresh, and logout.
///
/// Per session id: Active -> NearExpiry -> Refreshed (old id revoked), or
/// Active/NearExpiry -> Revoked on logout. Expiry needs no transition, a
/// later validation simply fails.
pub struct SessionService {
    minter: TokenMinter,
    store: Arc<dyn SessionStore>,
    user_verifier: Arc<dyn UserVerifier>,
    refresh_window: Duration,
    metrics: Arc<SessionMetrics>,
}

impl SessionService {
    pub fn new(
        minter: TokenMinter,
        store: Arc<dyn SessionStore>,
        user_verifier: Arc<dyn UserVerifier>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            minter,
            store,
            user_verifier,
            refresh_window: config.refresh_window,
            metrics: Arc::new(SessionMetrics::default()),
        }
    }

    pub fn metrics(&self) -> &Arc<SessionMetrics> {
        &self.metrics
    }

    /// Wires a service with random UUID session ids and the wall clock
    pub fn with_defaults(
        keys: KeyMaterial,
        store: Arc<dyn SessionStore>,
        user_verifier: Arc<dyn UserVerifier>,
        config: &SessionConfig,
    ) -> Self {
        let minter = TokenMinter::new(
            keys,
            store.clone(),
            Arc::new(UuidSessionIdGenerator::new()),
            Arc::new(SystemClock::new()),
            config,
        );
        Self::new(minter, store, user_verifier, config)
    }

    /// Verifies the credentials and opens a new session
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<MintedToken, SessionError> {
        let verified = self
            .user_verifier
            .is_user_account_password(username, password)
            .await
            .map_err(|e| {
                warn!(error = %e, "User store failed during login");
                SessionError::UserVerification(e.to_string())
            })?;

        if !verified {
            warn!("Login rejected");
            self.metrics.login_rejections.inc();
            return Err(SessionError::InvalidCredentials);
        }

        let minted = self.minter.mint(&UserContext::new(username)).await?;
        self.metrics.logins.inc();
        info!(session_id = %minted.session_id, "Login succeeded");
        Ok(minted)
    }

    /// Validates a token against its signature, validity window and the
    /// session store. With `refresh`, a token inside the refresh window is
    /// replaced by a token for a new session and the old session is revoked.
    #[instrument(skip(self, token))]
    pub async fn validate(&self, token: &str, refresh: bool) -> Result<ValidatedSession, SessionError> {
        let claims = self.minter.verify(token)?;

        if self.store.get(&claims.jti).await?.is_none() {
            warn!(session_id = %claims.jti, "Session not found - may have been revoked");
            return Err(SessionError::SessionRevoked);
        }

        let remaining = claims.exp - self.minter.clock().now().timestamp();
        if refresh && remaining < self.refresh_window.num_seconds() {
            let replacement = self.rotate(&claims.jti, claims.exp, &claims.user_context).await?;
            return Ok(ValidatedSession {
                token: replacement.token,
                session_id: replacement.session_id,
                user_context: claims.user_context,
                rotated: true,
            });
        }

        Ok(ValidatedSession {
            token: token.to_string(),
            session_id: claims.jti,
            user_context: claims.user_context,
            rotated: false,
        })
    }

    /// Revokes the session named by the token for every holder
    #[instrument(skip(self, token))]
    pub async fn logout(&self, token: &str) -> Result<(), SessionError> {
        let session = self.validate(token, false).await?;

        if !self.store.delete(&session.session_id).await? {
            warn!(session_id = %session.session_id, "Session vanished before logout");
            return Err(SessionError::SessionRevoked);
        }

        self.metrics.logouts.inc();
        info!(
            session_id = %session.session_id,
            username = %session.user_context.username,
            "Logged out"
        );
        Ok(())
    }

    /// Replaces a session with a new one for the same user.
    ///
    /// The replacement is signed before anything is deleted. Between the
    /// delete and the insert the old token is already rejected for every
    /// other holder (two tabs refreshing at once: one of them loses). If the
    /// insert fails the old record is put back so the caller is not logged
    /// out by an infrastructure error.
    async fn rotate(
        &self,
        old_session_id: &str,
        old_expires_at: i64,
        user_context: &UserContext,
    ) -> Result<MintedToken, SessionError> {
        let replacement = self.minter.sign(user_context)?;

        if !self.store.delete(old_session_id).await? {
            warn!(session_id = %old_session_id, "Session rotated or revoked concurrently");
            return Err(SessionError::SessionRevoked);
        }

        if let Err(e) = self.minter.register(&replacement).await {
            if let Err(restore_err) = self
                .store
                .insert(old_session_id, &old_expires_at.to_string())
                .await
            {
                error!(
                    session_id = %old_session_id,
                    error = %restore_err,
                    "Failed to restore session after aborted refresh"
                );
            }
            return Err(e);
        }

        self.metrics.rotations.inc();
        info!(
            old_session_id = %old_session_id,
            new_session_id = %replacement.session_id,
            "Session refreshed"
        );
        Ok(replacement)
    }
}
