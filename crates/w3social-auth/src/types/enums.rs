/*
[INPUT]:  Role and policy names from storage and configuration
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - enumerations shared across components
[UPDATE]: When roles or signature policies are added
*/

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strictly signature `s` values are checked during recovery
///
/// `Lenient` accepts high-s signatures, which some wallets and libraries
/// still emit. Both forms recover the same key, so accepting them does not
/// enable replay: nonces are consumed by value, not by signature bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignaturePolicy {
    #[default]
    Lenient,
    /// Reject signatures whose `s` is above half the curve order
    Strict,
}
