/*
[INPUT]:  Authenticated identities and presented session tokens
[OUTPUT]: Signed, time-bounded session tokens and their verified claims
[POS]:    Auth layer - stateless session credential (HS256 JWT)
[UPDATE]: When claims, signing algorithm, or expiry rules change
*/

use std::fmt;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::Mac;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::config::TokenKey;
use crate::error::{AuthError, Result};
use crate::types::{Address, Identity, Role};

const ALGORITHM: &str = "HS256";

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Address,
    role: Role,
    iat: i64,
    exp: i64,
    iss: String,
}

/// Verified contents of a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub address: Address,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Opaque session credential, safe to carry in a header
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn into_string(self) -> String {
        self.token
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Mints and verifies session tokens with a process-wide key
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    key: TokenKey,
    ttl: Duration,
    issuer: String,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(key: TokenKey, ttl: Duration, issuer: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            key,
            ttl,
            issuer: issuer.into(),
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a token carrying the identity's address and role
    pub fn mint(&self, identity: &Identity) -> SessionToken {
        let now = self.clock.now();
        let expires = now
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let issued_at = now.timestamp();
        let expires_at = expires.timestamp();

        let header = serde_json::json!({ "alg": ALGORITHM, "typ": "JWT" });
        let claims = serde_json::json!({
            "sub": identity.address,
            "role": identity.role,
            "iat": issued_at,
            "exp": expires_at,
            "iss": self.issuer,
        });

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        );
        let signature = self.sign(&signing_input);

        SessionToken {
            token: format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)),
            expires_at: DateTime::from_timestamp(expires_at, 0).unwrap_or(expires),
        }
    }

    /// Check integrity first, then expiry
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let mut segments = token.trim().split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(AuthError::TokenInvalid);
        };

        let header: Header = decode_segment(header_b64)?;
        if header.alg != ALGORITHM {
            return Err(AuthError::TokenInvalid);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthError::TokenInvalid)?;
        let mut mac = self.key.mac();
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::TokenInvalid)?;

        let claims: Claims = decode_segment(claims_b64)?;
        if claims.iss != self.issuer {
            return Err(AuthError::TokenInvalid);
        }

        let issued_at = DateTime::from_timestamp(claims.iat, 0).ok_or(AuthError::TokenInvalid)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(AuthError::TokenInvalid)?;

        if self.clock.now() >= expires_at {
            return Err(AuthError::TokenExpired);
        }

        Ok(SessionClaims {
            address: claims.sub,
            role: claims.role,
            issued_at,
            expires_at,
        })
    }

    fn sign(&self, signing_input: &str) -> Vec<u8> {
        let mut mac = self.key.mac();
        mac.update(signing_input.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::TokenInvalid)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::TokenInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Timelike};

    fn identity() -> Identity {
        let address: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();
        Identity::new(address, Utc::now())
    }

    fn issuer_with(key: TokenKey) -> (TokenIssuer, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
        let issuer = TokenIssuer::new(key, Duration::hours(24), "w3social-auth", Arc::new(clock.clone()));
        (issuer, clock)
    }

    fn issuer() -> (TokenIssuer, ManualClock) {
        issuer_with(TokenKey::generate())
    }

    #[test]
    fn test_mint_and_verify() {
        let (issuer, clock) = issuer();
        let identity = identity();
        let token = issuer.mint(&identity);

        assert_eq!(token.as_str().split('.').count(), 3);
        assert_eq!(token.expires_at(), clock.now() + Duration::hours(24));

        let claims = issuer.verify(token.as_str()).unwrap();
        assert_eq!(claims.address, identity.address);
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.issued_at, clock.now());
        assert_eq!(claims.expires_at, token.expires_at());
    }

    #[test]
    fn test_expiry_boundary() {
        let (issuer, clock) = issuer();
        let token = issuer.mint(&identity());
        let expiry = token.expires_at();

        clock.set(expiry - Duration::milliseconds(1));
        assert!(issuer.verify(token.as_str()).is_ok());

        clock.set(expiry + Duration::milliseconds(1));
        assert_eq!(issuer.verify(token.as_str()), Err(AuthError::TokenExpired));
    }

    #[test]
    fn test_oversized_ttl_still_verifies() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
        let ttl = Duration::seconds(10_000_000_000_000);
        let issuer = TokenIssuer::new(TokenKey::generate(), ttl, "w3social-auth", Arc::new(clock.clone()));
        assert_eq!(issuer.ttl(), ttl);

        let token = issuer.mint(&identity());
        assert_eq!(token.expires_at(), DateTime::<Utc>::MAX_UTC.with_nanosecond(0).unwrap());
        assert!(issuer.verify(token.as_str()).is_ok());
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let (issuer, _) = issuer();
        let token = issuer.mint(&identity());
        let parts: Vec<&str> = token.as_str().split('.').collect();

        let forged_claims = serde_json::json!({
            "sub": "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
            "role": "ADMIN",
            "iat": 0,
            "exp": i64::MAX / 1000,
            "iss": "w3social-auth",
        });
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(forged_claims.to_string()),
            parts[2]
        );
        assert_eq!(issuer.verify(&forged), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn test_signature_checked_before_expiry() {
        let (issuer, clock) = issuer();
        let token = issuer.mint(&identity());
        let (other, _) = issuer_with(TokenKey::generate());

        clock.advance(Duration::days(2));
        assert_eq!(issuer.verify(token.as_str()), Err(AuthError::TokenExpired));
        assert_eq!(other.verify(token.as_str()), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let key = TokenKey::generate();
        let (issuer, clock) = issuer_with(key.clone());
        let foreign = TokenIssuer::new(key, Duration::hours(24), "someone-else", Arc::new(clock));

        let token = foreign.mint(&identity());
        assert_eq!(issuer.verify(token.as_str()), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn test_unsigned_token_rejected() {
        let (issuer, _) = issuer();
        let token = issuer.mint(&identity());
        let parts: Vec<&str> = token.as_str().split('.').collect();

        let none_header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let stripped = format!("{none_header}.{}.", parts[1]);
        assert_eq!(issuer.verify(&stripped), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn test_garbage_rejected() {
        let (issuer, _) = issuer();
        for garbage in ["", "abc", "a.b", "a.b.c", "a.b.c.d", "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.test.signature"] {
            assert_eq!(issuer.verify(garbage), Err(AuthError::TokenInvalid), "{garbage}");
        }
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let (issuer, _) = issuer();
        let token = issuer.mint(&identity());
        assert!(!format!("{token:?}").contains(token.as_str()));
    }
}
