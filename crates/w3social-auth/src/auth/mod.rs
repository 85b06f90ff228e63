/*
[INPUT]:  Wallet addresses, signed challenge messages, and session tokens
[OUTPUT]: Challenges, identities, session tokens, and typed auth errors
[POS]:    Auth layer - challenge/response wallet authentication
[UPDATE]: When auth flow or component contracts change
*/

pub mod coordinator;
pub mod events;
pub mod evm_wallet;
pub mod identity_store;
pub mod jwt;
pub mod nonce;
pub mod wallet;

pub use coordinator::{AuthCoordinator, AuthOutcome, AuthRequest, AuthState};
pub use events::{ChannelEventSink, EventSink, NoopEventSink, TracingEventSink};
pub use evm_wallet::EvmWalletSigner;
pub use identity_store::{
    IdentityRepository, IdentityStore, IdentityTable, InsertOutcome, MemoryIdentityRepository,
    Provisioned,
};
pub use jwt::{SessionClaims, SessionToken, TokenIssuer};
pub use nonce::{MemoryNonceStore, NonceIssuer, NonceStore, NonceTable};
pub use wallet::{MockWalletSigner, WalletSigner};
