//! Messages consumed by the registry.
//!
//! Update sources (session handlers, metadata reports, the fleet manager)
//! describe what happened to a peer with a [`PeerUpdate`].  They are
//! serialised with [`serde`](https://serde.rs/) so that any source able to
//! produce JSON can drive the registry.

use serde::{Deserialize, Serialize};

use crate::peer::{NewPeer, PeerSystemMeta};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerUpdate {
    /// A peer has been admitted into an account.
    Register(NewPeer),
    /// The peer reported its system metadata.
    Meta { peer_id: String, meta: PeerSystemMeta },
    /// The peer's user completed an interactive login.
    Login { peer_id: String },
    /// The peer's management connection went up or down.
    Seen { peer_id: String, connected: bool },
    /// The peer was revoked or its ephemeral lifetime ended.
    Remove { peer_id: String },
}

impl PeerUpdate {
    pub fn peer_id(&self) -> &str {
        match self {
            PeerUpdate::Register(new) => &new.id,
            PeerUpdate::Meta { peer_id, .. }
            | PeerUpdate::Login { peer_id }
            | PeerUpdate::Seen { peer_id, .. }
            | PeerUpdate::Remove { peer_id } => peer_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_json() {
        let update: PeerUpdate =
            serde_json::from_str(r#"{"type":"login","peer_id":"p1"}"#).unwrap();
        assert_eq!(
            update,
            PeerUpdate::Login {
                peer_id: "p1".into()
            }
        );

        let update: PeerUpdate = serde_json::from_str(
            r#"{"type":"register","id":"p2","account_id":"a","key":"k","ip":"100.64.0.3"}"#,
        )
        .unwrap();
        assert_eq!(update.peer_id(), "p2");
    }
}
