/*
[INPUT]:  Committed authentication and profile state changes
[OUTPUT]: Tagged event payloads for notification collaborators
[POS]:    Data layer - outbound event schema
[UPDATE]: When a new event kind is published
*/

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Address;

/// Event published after a state change has committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    IdentityCreated { address: Address, id: Uuid },
    Authenticated { address: Address },
    ProfileUpdated { address: Address },
}

impl AuthEvent {
    pub fn address(&self) -> &Address {
        match self {
            AuthEvent::IdentityCreated { address, .. }
            | AuthEvent::Authenticated { address }
            | AuthEvent::ProfileUpdated { address } => address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_is_tagged() {
        let address: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();
        let json = serde_json::to_value(AuthEvent::Authenticated { address }).unwrap();
        assert_eq!(json["type"], "AUTHENTICATED");
        assert_eq!(json["address"], "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    }

    #[test]
    fn test_unknown_event_kind_rejected() {
        let payload = serde_json::json!({
            "type": "LIKE",
            "address": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
        });
        assert!(serde_json::from_value::<AuthEvent>(payload).is_err());
    }
}
