/*
[INPUT]:  Message text, signatures, and public keys
[OUTPUT]: Signing digests and recovered wallet addresses
[POS]:    Crypto layer - wallet-signature primitives
[UPDATE]: When the digest convention or recovery algorithm changes
*/

pub mod hasher;
pub mod recover;

pub use hasher::{Digest, PERSONAL_MESSAGE_PREFIX, keccak256, personal_digest};
pub use recover::SignatureRecoverer;
