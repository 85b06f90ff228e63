/*
[INPUT]:  Test configuration and well-known development keys
[OUTPUT]: Shared coordinator fixtures, wallets, and recording sinks
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for w3social-auth tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Mutex;
use w3social_auth::{
    AuthConfig, AuthCoordinator, AuthEvent, EventSink, EvmWalletSigner, ManualClock,
    MemoryIdentityRepository, MemoryNonceStore, WalletSigner,
};

/// Hardhat development account #0
pub const DEV_KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const DEV_ADDRESS_0: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

/// Hardhat development account #1
pub const DEV_KEY_1: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const DEV_ADDRESS_1: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

/// Coordinator over in-memory stores with a hand-driven clock
pub struct Harness {
    pub coordinator: AuthCoordinator,
    pub clock: ManualClock,
    pub config: AuthConfig,
    pub events: RecordingSink,
}

impl Harness {
    pub fn clock_now_plus(&self, by: chrono::Duration) -> chrono::DateTime<Utc> {
        use w3social_auth::Clock;
        self.clock.now() + by
    }
}

pub fn harness() -> Harness {
    harness_with(AuthConfig::generate())
}

pub fn harness_with(config: AuthConfig) -> Harness {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap());
    let events = RecordingSink::default();
    let coordinator = AuthCoordinator::new(
        &config,
        Arc::new(MemoryNonceStore::new()),
        Arc::new(MemoryIdentityRepository::new()),
        Arc::new(clock.clone()),
    )
    .expect("generated config is valid")
    .with_event_sink(Arc::new(events.clone()));

    Harness {
        coordinator,
        clock,
        config,
        events,
    }
}

pub fn wallet(key: &str) -> EvmWalletSigner {
    EvmWalletSigner::new(key).expect("valid development key")
}

/// Run the full challenge/sign/authenticate exchange
pub async fn sign_in(
    coordinator: &AuthCoordinator,
    wallet: &EvmWalletSigner,
) -> w3social_auth::Result<w3social_auth::AuthOutcome> {
    let address = wallet.address();
    let nonce = coordinator.request_challenge(&address).await?;
    let signature = wallet.sign_message(&nonce.message).await?;
    coordinator
        .authenticate(&address, &nonce.message, &signature)
        .await
}

/// Keeps every published event for later assertions
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<AuthEvent>>>,
}

impl RecordingSink {
    pub async fn recorded(&self) -> Vec<AuthEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn publish(&self, event: AuthEvent) {
        self.events.lock().await.push(event);
    }
}
