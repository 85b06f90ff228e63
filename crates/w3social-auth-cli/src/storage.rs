/*
[INPUT]:  Identity and nonce records from the auth core
[OUTPUT]: JSON files under the configured data directory
[POS]:    Persistence layer - file-backed NonceStore and IdentityRepository
[UPDATE]: When the on-disk layout, record schema, or locking changes
*/

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use w3social_auth::auth::{IdentityTable, InsertOutcome, NonceTable};
use w3social_auth::{Address, AuthError, Identity, IdentityRepository, Nonce, NonceStore};

const IDENTITIES_FILE: &str = "identities.json";
const NONCES_FILE: &str = "nonces.json";
const LOCK_FILE: &str = "store.lock";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

#[derive(Debug, Default)]
struct Tables {
    identities: IdentityTable,
    nonces: NonceTable,
}

#[derive(Debug)]
struct StorePaths {
    lock: PathBuf,
    identities: PathBuf,
    nonces: PathBuf,
}

impl StorePaths {
    fn new(data_dir: &Path) -> Self {
        Self {
            lock: data_dir.join(LOCK_FILE),
            identities: data_dir.join(IDENTITIES_FILE),
            nonces: data_dir.join(NONCES_FILE),
        }
    }

    fn load(&self) -> Result<Tables> {
        let identities: Vec<Identity> = load_records(&self.identities)?;
        let nonces: Vec<Nonce> = load_records(&self.nonces)?;
        Ok(Tables {
            identities: IdentityTable::from_records(identities),
            nonces: NonceTable::from_records(nonces),
        })
    }

    fn save_identities(&self, table: &IdentityTable) -> w3social_auth::Result<()> {
        let mut list: Vec<_> = table.records().cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        write_records(&self.identities, &list).map_err(AuthError::persistence)
    }

    fn save_nonces(&self, table: &NonceTable) -> w3social_auth::Result<()> {
        let mut list: Vec<_> = table.records().cloned().collect();
        list.sort_by(|a, b| a.address.cmp(&b.address));
        write_records(&self.nonces, &list).map_err(AuthError::persistence)
    }
}

/// Identities and live nonces persisted as two JSON files
///
/// Every operation holds an OS file lock on the data directory and works
/// on a fresh read of both files, so separate processes sharing one
/// directory see each other's writes and check-then-write steps are atomic
/// across them. A mutation is written before the call returns; nothing is
/// cached between calls.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    paths: Arc<StorePaths>,
}

impl JsonFileStore {
    pub async fn open(data_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("create data directory {}", data_dir.display()))?;

        let store = Self {
            paths: Arc::new(StorePaths::new(data_dir)),
        };
        let (identities, nonces) = store
            .with_tables(Access::Read, |_, tables| {
                Ok((tables.identities.len(), tables.nonces.len()))
            })
            .await
            .with_context(|| format!("load storage from {}", data_dir.display()))?;
        debug!(
            identities,
            nonces,
            data_dir = %data_dir.display(),
            "storage opened"
        );

        Ok(store)
    }

    /// Run `op` against the on-disk state under the store lock
    async fn with_tables<R, F>(&self, access: Access, op: F) -> w3social_auth::Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&StorePaths, &mut Tables) -> w3social_auth::Result<R> + Send + 'static,
    {
        let paths = self.paths.clone();
        tokio::task::spawn_blocking(move || {
            let _lock = lock_file(&paths.lock, access).map_err(AuthError::persistence)?;
            let mut tables = paths.load().map_err(AuthError::persistence)?;
            op(&paths, &mut tables)
        })
        .await
        .map_err(AuthError::persistence)?
    }
}

#[cfg(unix)]
fn lock_file(path: &Path, access: Access) -> Result<nix::fcntl::Flock<File>> {
    use nix::fcntl::{Flock, FlockArg};

    let file = open_lock_file(path)?;
    let arg = match access {
        Access::Read => FlockArg::LockShared,
        Access::Write => FlockArg::LockExclusive,
    };
    Flock::lock(file, arg)
        .map_err(|(_, errno)| anyhow::Error::from(errno))
        .with_context(|| format!("lock {}", path.display()))
}

#[cfg(not(unix))]
fn lock_file(path: &Path, access: Access) -> Result<File> {
    let file = open_lock_file(path)?;
    match access {
        Access::Read => file.lock_shared(),
        Access::Write => file.lock(),
    }
    .with_context(|| format!("lock {}", path.display()))?;
    Ok(file)
}

fn open_lock_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))
}

fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parse {}", path.display()))
}

fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let content = serde_json::to_string_pretty(records)?;

    // Write to a temp file then rename
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content).with_context(|| format!("write {}", temp_path.display()))?;
    fs::rename(&temp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

#[async_trait]
impl NonceStore for JsonFileStore {
    async fn replace(&self, nonce: Nonce) -> w3social_auth::Result<Option<Nonce>> {
        self.with_tables(Access::Write, move |paths, tables| {
            let previous = tables.nonces.replace(nonce);
            paths.save_nonces(&tables.nonces)?;
            Ok(previous)
        })
        .await
    }

    async fn live(&self, address: &Address) -> w3social_auth::Result<Option<Nonce>> {
        let address = *address;
        self.with_tables(Access::Read, move |_, tables| {
            Ok(tables.nonces.live(&address).cloned())
        })
        .await
    }

    async fn take_matching(
        &self,
        address: &Address,
        value: &str,
        now: DateTime<Utc>,
    ) -> w3social_auth::Result<Option<Nonce>> {
        let address = *address;
        let value = value.to_string();
        self.with_tables(Access::Write, move |paths, tables| {
            let before = tables.nonces.len();
            let taken = tables.nonces.take_matching(&address, &value, now);
            if tables.nonces.len() != before {
                paths.save_nonces(&tables.nonces)?;
            }
            Ok(taken)
        })
        .await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> w3social_auth::Result<usize> {
        self.with_tables(Access::Write, move |paths, tables| {
            let removed = tables.nonces.purge_expired(now);
            if removed > 0 {
                paths.save_nonces(&tables.nonces)?;
            }
            Ok(removed)
        })
        .await
    }
}

#[async_trait]
impl IdentityRepository for JsonFileStore {
    async fn insert(&self, identity: Identity) -> w3social_auth::Result<InsertOutcome> {
        self.with_tables(Access::Write, move |paths, tables| {
            let outcome = tables.identities.insert(identity)?;
            if outcome == InsertOutcome::Inserted {
                paths.save_identities(&tables.identities)?;
            }
            Ok(outcome)
        })
        .await
    }

    async fn find_by_address(&self, address: &Address) -> w3social_auth::Result<Option<Identity>> {
        let address = *address;
        self.with_tables(Access::Read, move |_, tables| {
            Ok(tables.identities.get(&address).cloned())
        })
        .await
    }

    async fn find_by_username(&self, username: &str) -> w3social_auth::Result<Option<Identity>> {
        let username = username.to_string();
        self.with_tables(Access::Read, move |_, tables| {
            Ok(tables.identities.get_by_username(&username).cloned())
        })
        .await
    }

    async fn save(&self, identity: Identity) -> w3social_auth::Result<()> {
        self.with_tables(Access::Write, move |paths, tables| {
            tables.identities.save(identity)?;
            paths.save_identities(&tables.identities)
        })
        .await
    }

    async fn count(&self) -> w3social_auth::Result<usize> {
        self.with_tables(Access::Read, |_, tables| Ok(tables.identities.len()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tokio_test::assert_ok;
    use w3social_auth::{
        AuthConfig, AuthCoordinator, EvmWalletSigner, SystemClock, WalletSigner,
    };

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn address() -> Address {
        "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap()
    }

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("w3social-auth-{name}-{}", uuid::Uuid::new_v4()))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()
    }

    fn nonce() -> Nonce {
        Nonce {
            address: address(),
            value: "1767322245000-abc".to_string(),
            message: "Sign this message to authenticate: x - 1767322245000-abc".to_string(),
            issued_at: now(),
            expires_at: now() + Duration::minutes(5),
        }
    }

    fn coordinator(config: &AuthConfig, store: JsonFileStore) -> AuthCoordinator {
        let store = Arc::new(store);
        AuthCoordinator::new(config, store.clone(), store, Arc::new(SystemClock)).unwrap()
    }

    #[tokio::test]
    async fn test_identities_survive_reopen() {
        let dir = temp_dir("identities");
        let store = assert_ok!(JsonFileStore::open(&dir).await);
        let identity = Identity::new(address(), now());

        assert_eq!(
            assert_ok!(store.insert(identity.clone()).await),
            InsertOutcome::Inserted
        );
        assert_eq!(
            assert_ok!(store.insert(Identity::new(address(), now())).await),
            InsertOutcome::AddressTaken
        );
        drop(store);

        let reopened = assert_ok!(JsonFileStore::open(&dir).await);
        assert_eq!(
            assert_ok!(reopened.find_by_address(&address()).await),
            Some(identity)
        );
        assert_eq!(assert_ok!(reopened.count().await), 1);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_consumed_nonce_is_gone_after_reopen() {
        let dir = temp_dir("nonces");
        let store = assert_ok!(JsonFileStore::open(&dir).await);
        let nonce = nonce();
        assert_ok!(store.replace(nonce.clone()).await);

        let reopened = assert_ok!(JsonFileStore::open(&dir).await);
        assert_eq!(assert_ok!(reopened.live(&address()).await), Some(nonce.clone()));

        let taken = assert_ok!(reopened.take_matching(&address(), &nonce.value, now()).await);
        assert_eq!(taken, Some(nonce));
        drop(reopened);

        let again = assert_ok!(JsonFileStore::open(&dir).await);
        assert_eq!(assert_ok!(again.live(&address()).await), None);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_stores_sharing_a_directory_see_each_other() {
        let dir = temp_dir("shared");
        let first = assert_ok!(JsonFileStore::open(&dir).await);
        let second = assert_ok!(JsonFileStore::open(&dir).await);

        let winner = Identity::new(address(), now());
        assert_eq!(
            assert_ok!(first.insert(winner.clone()).await),
            InsertOutcome::Inserted
        );
        assert_eq!(
            assert_ok!(second.insert(Identity::new(address(), now())).await),
            InsertOutcome::AddressTaken
        );
        assert_eq!(
            assert_ok!(second.find_by_address(&address()).await),
            Some(winner)
        );

        let nonce = nonce();
        assert_ok!(first.replace(nonce.clone()).await);
        assert_eq!(
            assert_ok!(second.take_matching(&address(), &nonce.value, now()).await),
            Some(nonce.clone())
        );
        assert_eq!(
            assert_ok!(first.take_matching(&address(), &nonce.value, now()).await),
            None
        );

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_take_across_stores_has_one_winner() {
        let dir = temp_dir("race");
        let nonce = nonce();
        assert_ok!(assert_ok!(JsonFileStore::open(&dir).await).replace(nonce.clone()).await);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = assert_ok!(JsonFileStore::open(&dir).await);
            let value = nonce.value.clone();
            handles.push(tokio::spawn(async move {
                store.take_matching(&address(), &value, now()).await
            }));
        }

        let mut taken = 0;
        for handle in handles {
            if assert_ok!(handle.await.unwrap()).is_some() {
                taken += 1;
            }
        }
        assert_eq!(taken, 1);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_replayed_signature_rejected_by_second_store() {
        let dir = temp_dir("replay");
        let config = AuthConfig::generate();
        let wallet = EvmWalletSigner::new(DEV_KEY).unwrap();
        let address = wallet.address();

        let issuing = coordinator(&config, assert_ok!(JsonFileStore::open(&dir).await));
        let challenge = assert_ok!(issuing.request_challenge(&address).await);
        let signature = assert_ok!(wallet.sign_message(&challenge.message).await);

        let first = coordinator(&config, assert_ok!(JsonFileStore::open(&dir).await));
        let second = coordinator(&config, assert_ok!(JsonFileStore::open(&dir).await));

        let accepted = assert_ok!(
            first
                .authenticate(&address, &challenge.message, &signature)
                .await
        );
        let replay = second
            .authenticate(&address, &challenge.message, &signature)
            .await;
        assert_eq!(replay.unwrap_err(), AuthError::NonceInvalid);

        let stored = assert_ok!(second.profile(&address).await);
        assert_eq!(stored.id, accepted.identity.id);
        assert_eq!(assert_ok!(second.identity_store().count().await), 1);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_record() {
        let dir = temp_dir("write-failure");
        let store = assert_ok!(JsonFileStore::open(&dir).await);
        // A directory where the temp file should go makes the write fail
        std::fs::create_dir_all(dir.join("identities.tmp")).unwrap();

        let result = store.insert(Identity::new(address(), now())).await;
        assert!(matches!(result, Err(AuthError::Persistence { .. })));
        assert_eq!(assert_ok!(store.count().await), 0);
        assert_eq!(assert_ok!(store.find_by_address(&address()).await), None);

        let _ = std::fs::remove_dir_all(dir);
    }
}
