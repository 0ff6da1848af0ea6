//! Connectivity and session state of a peer.
//!
//! A [`PeerStatus`] is a snapshot.  The owning [`Peer`](super::Peer) holds
//! it behind an [`Arc`] and installs a brand new one on every transition,
//! so anybody who grabbed the previous `Arc` keeps a complete, consistent
//! view of the old state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerStatus {
    /// Last time the peer talked to the management service.
    pub last_seen: DateTime<Utc>,
    /// Whether the peer is currently connected to the management service.
    pub connected: bool,
    pub login_expired: bool,
    /// Whether an administrator still has to approve the peer.
    pub requires_approval: bool,
}

impl PeerStatus {
    /// Returns an independent copy ready to be modified and installed as the
    /// next snapshot.
    pub fn copy(&self) -> PeerStatus {
        self.clone()
    }

    /// Derives the snapshot that follows a login-expiry decision.  An expired
    /// peer is never considered connected.
    pub fn with_login_expired(&self, expired: bool) -> Arc<PeerStatus> {
        let mut next = self.copy();
        next.login_expired = expired;
        if expired {
            next.connected = false;
        }
        Arc::new(next)
    }

    /// Derives the snapshot that follows a connectivity report.
    pub fn with_connected(&self, connected: bool, seen_at: DateTime<Utc>) -> Arc<PeerStatus> {
        let mut next = self.copy();
        next.connected = connected && !self.login_expired;
        next.last_seen = seen_at;
        Arc::new(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_is_independent() {
        let original = PeerStatus {
            connected: true,
            ..Default::default()
        };
        let mut copy = original.copy();
        copy.connected = false;
        copy.requires_approval = true;

        assert!(original.connected);
        assert!(!original.requires_approval);
        assert!(!copy.connected);
        assert!(copy.requires_approval);
    }

    #[test]
    fn expiring_forces_disconnect() {
        let original = PeerStatus {
            connected: true,
            ..Default::default()
        };
        let next = original.with_login_expired(true);

        assert!(next.login_expired);
        assert!(!next.connected);
        assert!(original.connected);
        assert!(!original.login_expired);
    }

    #[test]
    fn clearing_expiry_keeps_connection_flag() {
        let original = PeerStatus {
            connected: true,
            ..Default::default()
        };
        let next = original.with_login_expired(false);
        assert!(next.connected);
        assert!(!next.login_expired);
    }

    #[test]
    fn expired_peer_cannot_connect() {
        let expired = PeerStatus {
            login_expired: true,
            ..Default::default()
        };
        let now = Utc::now();
        let next = expired.with_connected(true, now);
        assert!(!next.connected);
        assert_eq!(next.last_seen, now);
    }
}
