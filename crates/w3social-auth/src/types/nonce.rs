/*
[INPUT]:  Address, nonce value, and issuance window from the nonce issuer
[OUTPUT]: Single-use challenge record and the message the wallet signs
[POS]:    Data layer - replay-protection challenge
[UPDATE]: When the challenge text or expiry semantics change
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Address;

/// Single-use challenge bound to one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nonce {
    pub address: Address,
    pub value: String,
    /// Full text the wallet is asked to sign
    pub message: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Nonce {
    /// Expired at exactly `expires_at`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether a presented message carries this nonce's value
    pub fn is_embedded_in(&self, message: &str) -> bool {
        !self.value.is_empty() && message.contains(&self.value)
    }
}
