/*
[INPUT]:  Wallet, identity, and session data shapes
[OUTPUT]: Typed Rust structs/enums with serialization support
[POS]:    Data layer - type definitions shared by all components
[UPDATE]: When data model changes or new types added
*/

pub mod address;
pub mod enums;
pub mod events;
pub mod identity;
pub mod nonce;
pub mod signature;

pub use address::{Address, AddressParseError};
pub use enums::*;
pub use events::AuthEvent;
pub use identity::{Identity, IdentityUpdate, PublicIdentity};
pub use nonce::Nonce;
pub use signature::{SIGNATURE_LENGTH, SignedMessage, WalletSignature};
