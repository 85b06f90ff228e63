/*
[INPUT]:  Deserialized configuration values (YAML/JSON) loaded at startup
[OUTPUT]: Validated authentication settings and token key material
[POS]:    Configuration layer - process-wide settings
[UPDATE]: When adding new configuration options
*/

use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Duration;
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::types::SignaturePolicy;

pub(crate) type HmacSha256 = Hmac<Sha256>;

/// Minimum decoded length of the token secret
pub const MIN_TOKEN_SECRET_BYTES: usize = 32;

/// Upper bound on `nonce_ttl_secs` (one day)
pub const MAX_NONCE_TTL_SECS: u64 = 24 * 60 * 60;

/// Upper bound on `token_ttl_secs` (one year)
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Startup configuration problems
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("token secret is not valid base64: {0}")]
    InvalidTokenSecret(String),

    #[error("token secret must decode to at least {MIN_TOKEN_SECRET_BYTES} bytes, got {len}")]
    TokenSecretTooShort { len: usize },

    #[error("invalid wallet private key: {0}")]
    InvalidPrivateKey(String),

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("{field} must not exceed {max} seconds")]
    DurationTooLong { field: &'static str, max: u64 },
}

/// Settings for the authentication core
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Base64-encoded symmetric key for session tokens
    pub token_secret: String,
    /// Lifetime of an issued challenge
    #[serde(default = "default_nonce_ttl_secs")]
    pub nonce_ttl_secs: u64,
    /// Lifetime of a session token
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// `iss` claim stamped into and required from tokens
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default)]
    pub signature_policy: SignaturePolicy,
    /// Text preceding `{address} - {nonce}` in the challenge message
    #[serde(default = "default_challenge_prefix")]
    pub challenge_prefix: String,
}

impl AuthConfig {
    /// Config with defaults and a freshly generated token secret
    pub fn generate() -> Self {
        Self {
            token_secret: TokenKey::generate().to_base64(),
            nonce_ttl_secs: default_nonce_ttl_secs(),
            token_ttl_secs: default_token_ttl_secs(),
            issuer: default_issuer(),
            signature_policy: SignaturePolicy::default(),
            challenge_prefix: default_challenge_prefix(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_ttl("nonce_ttl_secs", self.nonce_ttl_secs, MAX_NONCE_TTL_SECS)?;
        check_ttl("token_ttl_secs", self.token_ttl_secs, MAX_TOKEN_TTL_SECS)?;
        self.token_key().map(|_| ())
    }

    /// Decode the token key material
    pub fn token_key(&self) -> Result<TokenKey, ConfigError> {
        TokenKey::from_base64(&self.token_secret)
    }

    pub fn nonce_ttl(&self) -> Duration {
        ttl_from_secs(self.nonce_ttl_secs)
    }

    pub fn token_ttl(&self) -> Duration {
        ttl_from_secs(self.token_ttl_secs)
    }
}

fn check_ttl(field: &'static str, secs: u64, max: u64) -> Result<(), ConfigError> {
    if secs == 0 {
        return Err(ConfigError::ZeroDuration { field });
    }
    if secs > max {
        return Err(ConfigError::DurationTooLong { field, max });
    }
    Ok(())
}

/// Saturates instead of wrapping for values `validate` would reject
fn ttl_from_secs(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

fn default_nonce_ttl_secs() -> u64 {
    5 * 60
}

fn default_token_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_issuer() -> String {
    "w3social-auth".to_string()
}

fn default_challenge_prefix() -> String {
    "Sign this message to authenticate: ".to_string()
}

/// Symmetric session-token key, loaded once at startup
#[derive(Clone)]
pub struct TokenKey {
    bytes: Vec<u8>,
    mac: HmacSha256,
}

impl TokenKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() < MIN_TOKEN_SECRET_BYTES {
            return Err(ConfigError::TokenSecretTooShort { len: bytes.len() });
        }
        let mac = HmacSha256::new_from_slice(bytes)
            .map_err(|e| ConfigError::InvalidTokenSecret(e.to_string()))?;
        Ok(Self {
            bytes: bytes.to_vec(),
            mac,
        })
    }

    pub fn from_base64(encoded: &str) -> Result<Self, ConfigError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ConfigError::InvalidTokenSecret(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Random 32-byte key
    pub fn generate() -> Self {
        let mut bytes = [0u8; MIN_TOKEN_SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        match Self::from_bytes(&bytes) {
            Ok(key) => key,
            Err(_) => unreachable!("generated key meets the minimum length"),
        }
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// Keyed MAC state ready for a single use
    pub(crate) fn mac(&self) -> HmacSha256 {
        self.mac.clone()
    }
}

impl fmt::Debug for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenKey(..)")
    }
}
