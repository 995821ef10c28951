use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

use super::errors::SessionError;

/// Signing algorithm for every token this service issues
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS512;

/// RSA keypair used to sign and verify session tokens
#[derive(Clone)]
pub struct KeyMaterial {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

#[derive(Serialize, Deserialize)]
struct ProbeClaims {
    probe: String,
}

impl KeyMaterial {
    /// Loads both PEM files from disk.
    ///
    /// A missing file, a key that is not RSA, or a public key that does not
    /// match the private key all fail with `KeyLoad`.
    #[instrument(skip_all, fields(pub_path = %pub_path.as_ref().display(), priv_path = %priv_path.as_ref().display()))]
    pub fn load(
        pub_path: impl AsRef<Path>,
        priv_path: impl AsRef<Path>,
    ) -> Result<Self, SessionError> {
        let pub_pem = read_pem(pub_path.as_ref())?;
        let priv_pem = read_pem(priv_path.as_ref())?;

        let keys = Self::from_pem(&pub_pem, &priv_pem)?;
        info!("Loaded RSA signing keypair");
        Ok(keys)
    }

    /// Parses an in-memory PEM keypair
    pub fn from_pem(pub_pem: &[u8], priv_pem: &[u8]) -> Result<Self, SessionError> {
        let encoding_key = EncodingKey::from_rsa_pem(priv_pem)
            .map_err(|e| SessionError::KeyLoad(format!("private key: {}", e)))?;
        let decoding_key = DecodingKey::from_rsa_pem(pub_pem)
            .map_err(|e| SessionError::KeyLoad(format!("public key: {}", e)))?;

        let keys = Self {
            encoding_key,
            decoding_key,
        };
        keys.probe()?;
        Ok(keys)
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// PEM parsing is lazy, so sign and verify once to surface a bad key now
    fn probe(&self) -> Result<(), SessionError> {
        let claims = ProbeClaims {
            probe: "keypair".to_string(),
        };

        let token = encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| SessionError::KeyLoad(format!("private key cannot sign: {}", e)))?;

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        decode::<ProbeClaims>(&token, &self.decoding_key, &validation).map_err(|e| {
            warn!(error = %e, "Public key does not verify private key signature");
            SessionError::KeyLoad(format!("public key does not match private key: {}", e))
        })?;

        debug!("Keypair probe succeeded");
        Ok(())
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial").finish_non_exhaustive()
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>, SessionError> {
    std::fs::read(path).map_err(|e| {
        warn!(path = %path.display(), error = %e, "Failed to read key file");
        SessionError::KeyLoad(format!("{}: {}", path.display(), e))
    })
}
