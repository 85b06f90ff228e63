/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public wallet-authentication crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod types;

// Re-export commonly used types from auth
pub use auth::{
    AuthCoordinator,
    AuthOutcome,
    AuthRequest,
    AuthState,
    EventSink,
    EvmWalletSigner,
    IdentityRepository,
    IdentityStore,
    MemoryIdentityRepository,
    MemoryNonceStore,
    MockWalletSigner,
    NonceIssuer,
    NonceStore,
    SessionClaims,
    SessionToken,
    TokenIssuer,
    WalletSigner,
};

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AuthConfig, ConfigError, TokenKey};
pub use crypto::{SignatureRecoverer, personal_digest};
pub use error::{AuthError, Result};

// Re-export all types
pub use types::*;
