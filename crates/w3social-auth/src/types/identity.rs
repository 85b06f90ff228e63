/*
[INPUT]:  Recovered wallet addresses and profile edits
[OUTPUT]: Account records and their public view
[POS]:    Data layer - identity model owned by the identity store
[UPDATE]: When profile fields are added or visibility changes
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Address, Role};

/// Account bound to a wallet address
///
/// The address never changes after creation; every other field is
/// editable by the owning address only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub address: Address,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// New account with default role and empty profile
    pub fn new(address: Address, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            address,
            username: None,
            bio: None,
            avatar_url: None,
            cover_url: None,
            role: Role::User,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update; `None` leaves a field unchanged
    pub fn apply(&mut self, update: &IdentityUpdate, now: DateTime<Utc>) {
        if let Some(username) = update.normalized_username() {
            self.username = username;
        }
        if let Some(bio) = &update.bio {
            self.bio = non_empty(bio);
        }
        if let Some(avatar_url) = &update.avatar_url {
            self.avatar_url = non_empty(avatar_url);
        }
        if let Some(cover_url) = &update.cover_url {
            self.cover_url = non_empty(cover_url);
        }
        self.updated_at = now;
    }

    pub fn to_public(&self) -> PublicIdentity {
        PublicIdentity::from(self)
    }
}

/// Partial profile edit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

impl IdentityUpdate {
    /// Trimmed username change: `Some(None)` clears, `Some(Some(_))` sets
    pub fn normalized_username(&self) -> Option<Option<String>> {
        self.username.as_deref().map(non_empty)
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.bio.is_none()
            && self.avatar_url.is_none()
            && self.cover_url.is_none()
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Identity fields safe to hand back to any caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    pub id: Uuid,
    #[serde(rename = "walletAddress")]
    pub address: Address,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub cover_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&Identity> for PublicIdentity {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            address: identity.address,
            username: identity.username.clone(),
            bio: identity.bio.clone(),
            avatar_url: identity.avatar_url.clone(),
            cover_url: identity.cover_url.clone(),
            role: identity.role,
            created_at: identity.created_at,
        }
    }
}
