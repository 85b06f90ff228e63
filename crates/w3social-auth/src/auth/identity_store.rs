/*
[INPUT]:  Recovered wallet addresses and owner-issued profile edits
[OUTPUT]: Identity records, created at most once per address
[POS]:    Auth layer - account records backed by the persistence collaborator
[UPDATE]: When identity lookup, creation, or uniqueness rules change
*/

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::{AuthError, Result};
use crate::types::{Address, Identity, IdentityUpdate};

/// Result of an insert against the address uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record for the address already exists; nothing was written
    AddressTaken,
}

/// Persistence contract for identities
///
/// Implementations enforce uniqueness on address and on username; that
/// constraint is what arbitrates concurrent account creation.
#[async_trait]
pub trait IdentityRepository: Send + Sync + Debug {
    async fn insert(&self, identity: Identity) -> Result<InsertOutcome>;

    async fn find_by_address(&self, address: &Address) -> Result<Option<Identity>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>>;

    /// Overwrite an existing record
    ///
    /// Fails with `NotFound` if absent and `UsernameTaken` if another
    /// identity holds the username.
    async fn save(&self, identity: Identity) -> Result<()>;

    async fn count(&self) -> Result<usize>;
}

/// Identities with address and username indexes
#[derive(Debug, Clone, Default)]
pub struct IdentityTable {
    by_address: HashMap<Address, Identity>,
    usernames: HashMap<String, Address>,
}

impl IdentityTable {
    /// Rebuild from stored records
    ///
    /// A later record for an already-loaded address is dropped. A later
    /// record whose username is already held is kept with the username
    /// cleared.
    pub fn from_records(records: impl IntoIterator<Item = Identity>) -> Self {
        let mut table = Self::default();
        for identity in records {
            let address = identity.address;
            match table.insert(identity.clone()) {
                Ok(InsertOutcome::Inserted) => {}
                Ok(InsertOutcome::AddressTaken) => {
                    warn!(address = %address, "duplicate identity record dropped");
                }
                Err(err) => {
                    warn!(address = %address, error = %err, "username already held; loading without it");
                    let mut identity = identity;
                    identity.username = None;
                    if let Err(err) = table.insert(identity) {
                        warn!(address = %address, error = %err, "identity record dropped");
                    }
                }
            }
        }
        table
    }

    pub fn records(&self) -> impl Iterator<Item = &Identity> {
        self.by_address.values()
    }

    pub fn insert(&mut self, identity: Identity) -> Result<InsertOutcome> {
        if self.by_address.contains_key(&identity.address) {
            return Ok(InsertOutcome::AddressTaken);
        }
        if let Some(username) = &identity.username {
            if self.usernames.contains_key(username) {
                return Err(AuthError::UsernameTaken {
                    username: username.clone(),
                });
            }
            self.usernames.insert(username.clone(), identity.address);
        }
        self.by_address.insert(identity.address, identity);
        Ok(InsertOutcome::Inserted)
    }

    pub fn get(&self, address: &Address) -> Option<&Identity> {
        self.by_address.get(address)
    }

    pub fn get_by_username(&self, username: &str) -> Option<&Identity> {
        self.usernames
            .get(username)
            .and_then(|address| self.by_address.get(address))
    }

    pub fn save(&mut self, identity: Identity) -> Result<()> {
        let previous_username = match self.by_address.get(&identity.address) {
            Some(existing) => existing.username.clone(),
            None => {
                return Err(AuthError::NotFound {
                    address: identity.address.to_string(),
                });
            }
        };

        if let Some(username) = &identity.username {
            match self.usernames.get(username) {
                Some(owner) if *owner != identity.address => {
                    return Err(AuthError::UsernameTaken {
                        username: username.clone(),
                    });
                }
                _ => {}
            }
        }

        if previous_username != identity.username {
            if let Some(old) = previous_username {
                self.usernames.remove(&old);
            }
            if let Some(new) = &identity.username {
                self.usernames.insert(new.clone(), identity.address);
            }
        }

        self.by_address.insert(identity.address, identity);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

/// In-process identity repository
#[derive(Debug, Default)]
pub struct MemoryIdentityRepository {
    table: Mutex<IdentityTable>,
}

impl MemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityRepository for MemoryIdentityRepository {
    async fn insert(&self, identity: Identity) -> Result<InsertOutcome> {
        self.table.lock().await.insert(identity)
    }

    async fn find_by_address(&self, address: &Address) -> Result<Option<Identity>> {
        Ok(self.table.lock().await.get(address).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>> {
        Ok(self.table.lock().await.get_by_username(username).cloned())
    }

    async fn save(&self, identity: Identity) -> Result<()> {
        self.table.lock().await.save(identity)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.table.lock().await.len())
    }
}

/// Outcome of [`IdentityStore::get_or_create`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioned {
    Existing(Identity),
    Created(Identity),
}

impl Provisioned {
    pub fn identity(&self) -> &Identity {
        match self {
            Provisioned::Existing(identity) | Provisioned::Created(identity) => identity,
        }
    }

    pub fn into_identity(self) -> Identity {
        match self {
            Provisioned::Existing(identity) | Provisioned::Created(identity) => identity,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Provisioned::Created(_))
    }
}

/// Owns identity records; the only account-creation path
#[derive(Debug, Clone)]
pub struct IdentityStore {
    repository: Arc<dyn IdentityRepository>,
    clock: Arc<dyn Clock>,
}

impl IdentityStore {
    pub fn new(repository: Arc<dyn IdentityRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Return the identity for `address`, creating it on first sight
    ///
    /// Concurrent callers for a new address converge on one record: the
    /// loser of the insert race re-reads the winner's row.
    pub async fn get_or_create(&self, address: &Address) -> Result<Provisioned> {
        if let Some(existing) = self.repository.find_by_address(address).await? {
            return Ok(Provisioned::Existing(existing));
        }

        let candidate = Identity::new(*address, self.clock.now());
        match self.repository.insert(candidate.clone()).await? {
            InsertOutcome::Inserted => {
                debug!(address = %address, id = %candidate.id, "identity created");
                Ok(Provisioned::Created(candidate))
            }
            InsertOutcome::AddressTaken => {
                debug!(address = %address, "lost identity creation race, re-reading");
                self.repository
                    .find_by_address(address)
                    .await?
                    .map(Provisioned::Existing)
                    .ok_or_else(|| AuthError::NotFound {
                        address: address.to_string(),
                    })
            }
        }
    }

    pub async fn find_by_address(&self, address: &Address) -> Result<Option<Identity>> {
        self.repository.find_by_address(address).await
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<Identity>> {
        self.repository.find_by_username(username.trim()).await
    }

    /// The identity for `address`, or `NotFound`
    pub async fn get(&self, address: &Address) -> Result<Identity> {
        self.repository
            .find_by_address(address)
            .await?
            .ok_or_else(|| AuthError::NotFound {
                address: address.to_string(),
            })
    }

    /// Apply a profile edit to the identity owned by `address`
    pub async fn update(&self, address: &Address, update: &IdentityUpdate) -> Result<Identity> {
        let mut identity = self.get(address).await?;
        if update.is_empty() {
            return Ok(identity);
        }

        if let Some(Some(username)) = update.normalized_username() {
            if let Some(owner) = self.repository.find_by_username(&username).await? {
                if owner.address != *address {
                    return Err(AuthError::UsernameTaken { username });
                }
            }
        }

        identity.apply(update, self.clock.now());
        self.repository.save(identity.clone()).await?;
        Ok(identity)
    }

    pub async fn count(&self) -> Result<usize> {
        self.repository.count().await
    }
}
