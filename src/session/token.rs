use chrono::Duration;
use jsonwebtoken::{decode, encode, Header, Validation};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    config::SessionConfig,
    errors::SessionError,
    generators::{Clock, SessionIdGenerator},
    keys::{KeyMaterial, SIGNING_ALGORITHM},
    store::SessionStore,
    types::{MintedToken, SessionClaims, UserContext},
};

/// Builds, signs and verifies session tokens, and registers their sessions
#[derive(Clone)]
pub struct TokenMinter {
    keys: KeyMaterial,
    store: Arc<dyn SessionStore>,
    id_generator: Arc<dyn SessionIdGenerator>,
    clock: Arc<dyn Clock>,
    lifetime: Duration,
    issuer: String,
    audience: String,
}

impl TokenMinter {
    pub fn new(
        keys: KeyMaterial,
        store: Arc<dyn SessionStore>,
        id_generator: Arc<dyn SessionIdGenerator>,
        clock: Arc<dyn Clock>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            keys,
            store,
            id_generator,
            clock,
            lifetime: config.token_lifetime,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        }
    }

    /// Signs a token for a brand-new session and registers the session.
    ///
    /// Nothing is written to the store unless signing succeeded, and no token
    /// is returned unless the store accepted the session.
    #[instrument(skip(self), fields(username = %user_context.username))]
    pub async fn mint(&self, user_context: &UserContext) -> Result<MintedToken, SessionError> {
        let minted = self.sign(user_context)?;
        self.register(&minted).await?;

        info!(session_id = %minted.session_id, "Minted token and registered session");
        Ok(minted)
    }

    /// Signs a token for a new session id without registering it
    pub fn sign(&self, user_context: &UserContext) -> Result<MintedToken, SessionError> {
        let now = self.clock.now();
        let session_id = self.id_generator.generate();
        let exp = now
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| {
                warn!(lifetime_secs = self.lifetime.num_seconds(), "Token expiry out of range");
                SessionError::Signing("token lifetime overflows the expiry timestamp".to_string())
            })?
            .timestamp();

        let claims = SessionClaims {
            user_context: user_context.clone(),
            sub: user_context.username.clone(),
            iss: self.issuer.clone(),
            aud: vec![self.audience.clone()],
            jti: session_id.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp,
        };

        debug!(
            session_id = %session_id,
            exp_timestamp = exp,
            "Signing session token"
        );

        let token = encode(
            &Header::new(SIGNING_ALGORITHM),
            &claims,
            self.keys.encoding_key(),
        )
        .map_err(|e| {
            warn!(error = %e, "Failed to sign session token");
            SessionError::Signing(e.to_string())
        })?;

        Ok(MintedToken {
            token,
            session_id,
            expires_at: exp,
        })
    }

    /// Makes a signed token's session live. The stored value is the expiry,
    /// used only for purging dead records.
    pub async fn register(&self, minted: &MintedToken) -> Result<(), SessionError> {
        self.store
            .insert(&minted.session_id, &minted.expires_at.to_string())
            .await
            .map_err(|e| {
                warn!(session_id = %minted.session_id, error = %e, "Failed to register session");
                e
            })
    }

    /// Checks signature, issuer, audience and the validity window.
    ///
    /// Does not consult the session store.
    #[instrument(skip_all)]
    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);
        // Time is checked below against our own clock, with no leeway
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        let claims = decode::<SessionClaims>(token, self.keys.decoding_key(), &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Failed to decode session token");
                SessionError::from(e)
            })?;

        let now = self.clock.now().timestamp();
        if now < claims.nbf {
            debug!(nbf = claims.nbf, now = now, "Token used before not-before");
            return Err(SessionError::TokenNotYetValid);
        }
        if now >= claims.exp {
            debug!(exp = claims.exp, now = now, "Token used after expiry");
            return Err(SessionError::TokenExpired);
        }

        debug!(
            username = %claims.sub,
            session_id = %claims.jti,
            exp = claims.exp,
            "Session token verified"
        );
        Ok(claims)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{generators::UuidSessionIdGenerator, store::InMemorySessionStore};
    use crate::shared::test_utils::{test_keys, FailingSessionStore, ManualClock};
    use jsonwebtoken::{Algorithm, EncodingKey};

    fn minter_with(
        store: Arc<dyn SessionStore>,
        clock: Arc<ManualClock>,
    ) -> TokenMinter {
        TokenMinter::new(
            test_keys(),
            store,
            Arc::new(UuidSessionIdGenerator::new()),
            clock,
            &SessionConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_mint_and_verify_token() {
        let store = Arc::new(InMemorySessionStore::new());
        let clock = Arc::new(ManualClock::new());
        let minter = minter_with(store.clone(), clock.clone());

        let minted = minter.mint(&UserContext::new("alice")).await.unwrap();
        assert_eq!(minted.token.split('.').count(), 3);
        assert!(store.has_session(&minted.session_id).await);

        let claims = minter.verify(&minted.token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.user_context.username, "alice");
        assert_eq!(claims.jti, minted.session_id);
        assert_eq!(claims.iss, "wordserweb");
        assert_eq!(claims.aud, vec!["wordserweb".to_string()]);
        assert_eq!(claims.iat, claims.nbf);
        assert_eq!(claims.exp - claims.iat, Duration::hours(24).num_seconds());
    }

    #[tokio::test]
    async fn test_header_declares_rs512() {
        let store = Arc::new(InMemorySessionStore::new());
        let minter = minter_with(store, Arc::new(ManualClock::new()));

        let minted = minter.sign(&UserContext::new("alice")).unwrap();
        let header = jsonwebtoken::decode_header(&minted.token).unwrap();
        assert_eq!(header.alg, Algorithm::RS512);
    }

    #[tokio::test]
    async fn test_sign_does_not_register() {
        let store = Arc::new(InMemorySessionStore::new());
        let minter = minter_with(store.clone(), Arc::new(ManualClock::new()));

        let minted = minter.sign(&UserContext::new("alice")).unwrap();
        assert!(!store.has_session(&minted.session_id).await);
    }

    #[tokio::test]
    async fn test_mint_fails_when_store_rejects() {
        let minter = minter_with(
            Arc::new(FailingSessionStore),
            Arc::new(ManualClock::new()),
        );

        let result = minter.mint(&UserContext::new("alice")).await;
        assert!(matches!(result, Err(SessionError::Store(_))));
    }

    #[tokio::test]
    async fn test_mint_with_unrepresentable_expiry_fails_cleanly() {
        let store = Arc::new(InMemorySessionStore::new());
        let config = SessionConfig::default()
            .with_token_lifetime(Duration::seconds(100_000_000_000_000));
        let minter = TokenMinter::new(
            test_keys(),
            store.clone(),
            Arc::new(UuidSessionIdGenerator::new()),
            Arc::new(ManualClock::new()),
            &config,
        );

        let result = minter.mint(&UserContext::new("alice")).await;
        assert!(matches!(result, Err(SessionError::Signing(_))));
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_verify_expired_token() {
        let store = Arc::new(InMemorySessionStore::new());
        let clock = Arc::new(ManualClock::new());
        let minter = minter_with(store, clock.clone());

        let minted = minter.sign(&UserContext::new("alice")).unwrap();
        clock.advance(Duration::hours(24));

        assert_eq!(minter.verify(&minted.token), Err(SessionError::TokenExpired));
    }

    #[tokio::test]
    async fn test_verify_not_yet_valid_token() {
        let store = Arc::new(InMemorySessionStore::new());
        let clock = Arc::new(ManualClock::new());
        let minter = minter_with(store, clock.clone());

        let minted = minter.sign(&UserContext::new("alice")).unwrap();
        clock.advance(Duration::seconds(-30));

        assert_eq!(
            minter.verify(&minted.token),
            Err(SessionError::TokenNotYetValid)
        );
    }

    #[test]
    fn test_verify_garbage_token() {
        let minter = minter_with(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(ManualClock::new()),
        );
        let result = minter.verify("invalid.token.here");
        assert!(matches!(result, Err(SessionError::TokenMalformed(_))));
    }

    #[test]
    fn test_verify_rejects_tampered_payload() {
        let minter = minter_with(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(ManualClock::new()),
        );
        let alice = minter.sign(&UserContext::new("alice")).unwrap();
        let mallory = minter.sign(&UserContext::new("mallory")).unwrap();

        // Mallory's payload under Alice's signature
        let alice_parts: Vec<&str> = alice.token.split('.').collect();
        let mallory_parts: Vec<&str> = mallory.token.split('.').collect();
        let forged = format!("{}.{}.{}", alice_parts[0], mallory_parts[1], alice_parts[2]);

        assert_eq!(
            minter.verify(&forged),
            Err(SessionError::TokenInvalidSignature)
        );
    }

    #[test]
    fn test_verify_rejects_symmetric_algorithm() {
        let clock = Arc::new(ManualClock::new());
        let minter = minter_with(Arc::new(InMemorySessionStore::new()), clock.clone());
        let now = clock.now();

        let claims = SessionClaims {
            user_context: UserContext::new("alice"),
            sub: "alice".to_string(),
            iss: "wordserweb".to_string(),
            aud: vec!["wordserweb".to_string()],
            jti: "forged".to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let forged = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"guessed-secret"),
        )
        .unwrap();

        assert_eq!(
            minter.verify(&forged),
            Err(SessionError::TokenInvalidSignature)
        );
    }
}
