/*
[INPUT]:  Wallet address requesting a challenge; presented nonce values
[OUTPUT]: Single-use challenges and atomic consume decisions
[POS]:    Auth layer - replay protection (challenge issuance)
[UPDATE]: When nonce format, expiry, or storage contract changes
*/

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use tokio::sync::Mutex;
use tracing::debug;

use crate::clock::Clock;
use crate::error::{AuthError, Result};
use crate::types::{Address, Nonce};

const NONCE_RANDOM_BYTES: usize = 16;

/// Persistence contract for live nonces
///
/// At most one live nonce exists per address. `take_matching` must check and
/// remove as one atomic step so a captured signature cannot be replayed by
/// concurrent requests.
#[async_trait]
pub trait NonceStore: Send + Sync + Debug {
    /// Make `nonce` the live nonce for its address, returning the one it displaced
    async fn replace(&self, nonce: Nonce) -> Result<Option<Nonce>>;

    async fn live(&self, address: &Address) -> Result<Option<Nonce>>;

    /// Remove and return the live nonce if it has `value` and is unexpired at `now`
    async fn take_matching(
        &self,
        address: &Address,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Nonce>>;

    /// Drop every nonce expired at `now`, returning how many were removed
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Live nonces keyed by address; the shared core of the store implementations
#[derive(Debug, Clone, Default)]
pub struct NonceTable {
    nonces: HashMap<Address, Nonce>,
}

impl NonceTable {
    pub fn from_records(records: impl IntoIterator<Item = Nonce>) -> Self {
        Self {
            nonces: records
                .into_iter()
                .map(|nonce| (nonce.address, nonce))
                .collect(),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &Nonce> {
        self.nonces.values()
    }

    pub fn replace(&mut self, nonce: Nonce) -> Option<Nonce> {
        self.nonces.insert(nonce.address, nonce)
    }

    pub fn live(&self, address: &Address) -> Option<&Nonce> {
        self.nonces.get(address)
    }

    pub fn take_matching(
        &mut self,
        address: &Address,
        value: &str,
        now: DateTime<Utc>,
    ) -> Option<Nonce> {
        let current = self.nonces.get(address)?;
        if current.is_expired_at(now) {
            self.nonces.remove(address);
            return None;
        }
        if current.value != value {
            return None;
        }
        self.nonces.remove(address)
    }

    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.nonces.len();
        self.nonces.retain(|_, nonce| !nonce.is_expired_at(now));
        before - self.nonces.len()
    }

    pub fn len(&self) -> usize {
        self.nonces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nonces.is_empty()
    }
}

/// In-process nonce store
#[derive(Debug, Default)]
pub struct MemoryNonceStore {
    table: Mutex<NonceTable>,
}

impl MemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NonceStore for MemoryNonceStore {
    async fn replace(&self, nonce: Nonce) -> Result<Option<Nonce>> {
        Ok(self.table.lock().await.replace(nonce))
    }

    async fn live(&self, address: &Address) -> Result<Option<Nonce>> {
        Ok(self.table.lock().await.live(address).cloned())
    }

    async fn take_matching(
        &self,
        address: &Address,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Nonce>> {
        Ok(self.table.lock().await.take_matching(address, value, now))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        Ok(self.table.lock().await.purge_expired(now))
    }
}

/// Issues and consumes address-bound challenges
#[derive(Debug, Clone)]
pub struct NonceIssuer {
    store: Arc<dyn NonceStore>,
    ttl: Duration,
    challenge_prefix: String,
    clock: Arc<dyn Clock>,
}

impl NonceIssuer {
    pub fn new(
        store: Arc<dyn NonceStore>,
        ttl: Duration,
        challenge_prefix: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            ttl,
            challenge_prefix: challenge_prefix.into(),
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a fresh challenge, invalidating any unconsumed one for `address`
    pub async fn issue(&self, address: &Address) -> Result<Nonce> {
        let now = self.clock.now();
        let value = generate_value(now);
        let message = format!("{}{} - {}", self.challenge_prefix, address, value);

        let nonce = Nonce {
            address: *address,
            value,
            message,
            issued_at: now,
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        if let Some(previous) = self.store.replace(nonce.clone()).await? {
            debug!(
                address = %address,
                previous_issued_at = %previous.issued_at,
                "replaced unconsumed nonce"
            );
        }

        Ok(nonce)
    }

    /// The unexpired live nonce for `address`
    pub async fn live(&self, address: &Address) -> Result<Nonce> {
        let now = self.clock.now();
        match self.store.live(address).await? {
            Some(nonce) if !nonce.is_expired_at(now) => Ok(nonce),
            _ => Err(AuthError::NonceInvalid),
        }
    }

    /// Mark `value` used; fails closed on a second use, expiry, or mismatch
    pub async fn consume(&self, address: &Address, value: &str) -> Result<()> {
        let now = self.clock.now();
        match self.store.take_matching(address, value, now).await? {
            Some(_) => Ok(()),
            None => Err(AuthError::NonceInvalid),
        }
    }

    pub async fn purge_expired(&self) -> Result<usize> {
        self.store.purge_expired(self.clock.now()).await
    }
}

/// `{unix_millis}-{random hex}`
fn generate_value(now: DateTime<Utc>) -> String {
    let mut random = [0u8; NONCE_RANDOM_BYTES];
    OsRng.fill_bytes(&mut random);
    format!("{}-{}", now.timestamp_millis(), hex::encode(random))
}
