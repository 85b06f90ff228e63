/*
[INPUT]:  Raw message text presented by the wallet holder
[OUTPUT]: 32-byte keccak-256 digest in the wallet personal-sign convention
[POS]:    Crypto layer - message digest (leaf component)
[UPDATE]: When the signing prefix convention changes
*/

use tiny_keccak::{Hasher as _, Keccak};

/// Prefix the wallet signing UI applies before hashing a personal message
pub const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// 32-byte message digest
pub type Digest = [u8; 32];

/// Plain keccak-256 over arbitrary bytes
pub fn keccak256(data: &[u8]) -> Digest {
    let mut keccak = Keccak::v256();
    keccak.update(data);
    let mut out = [0u8; 32];
    keccak.finalize(&mut out);
    out
}

/// Digest a message the way wallets do for `personal_sign`
///
/// The length is the decimal byte length of the UTF-8 message, not its
/// character count.
pub fn personal_digest(message: &str) -> Digest {
    let mut keccak = Keccak::v256();
    keccak.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    keccak.update(message.len().to_string().as_bytes());
    keccak.update(message.as_bytes());
    let mut out = [0u8; 32];
    keccak.finalize(&mut out);
    out
}
