//! Shared, lock-guarded set of peers.
//!
//! The registry is the synchronisation point the peer entity itself does not
//! have.  Every write happens under the lock, and readers get either a deep
//! copy of a peer or an `Arc` to its current status snapshot, which stays
//! valid and consistent after later transitions.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::error::PeerError;
use crate::peer::{NewPeer, Peer, PeerStatus, PeerSystemMeta};
use crate::settings::Settings;
use crate::types::PeerUpdate;

/// Kind of activity recorded for the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    PeerAdded,
    PeerMetaUpdated,
    PeerLoggedIn,
    PeerLoginExpired,
    PeerRemoved,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEvent {
    pub activity: Activity,
    pub peer_id: String,
    pub account_id: String,
    /// `name`, `fqdn` and `ip` of the peer.
    pub meta: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct PeerRegistry {
    peers: Arc<RwLock<HashMap<String, Peer>>>,
    settings: Settings,
}

impl PeerRegistry {
    pub fn new(settings: Settings) -> Self {
        Self {
            peers: Arc::new(RwLock::new(HashMap::new())),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Admits a peer.  A peer whose login is already due under the account
    /// settings enters the registry marked as expired.
    pub async fn register(&self, new: NewPeer) -> Result<ActivityEvent, PeerError> {
        let mut peer = Peer::new(new)?;
        let mut peers = self.peers.write().await;
        if peers.contains_key(&peer.id) {
            return Err(PeerError::AlreadyRegistered(peer.id));
        }
        let event = self.record(Activity::PeerAdded, &peer);
        let (expired, _) = self.settings.peer_login_expired(&peer);
        if expired {
            peer.mark_login_expired(true);
            self.record(Activity::PeerLoginExpired, &peer);
        }
        peers.insert(peer.id.clone(), peer);
        Ok(event)
    }

    /// Returns an independent copy of the peer.
    pub async fn get(&self, peer_id: &str) -> Option<Peer> {
        self.peers.read().await.get(peer_id).cloned()
    }

    /// Returns the peer's current status snapshot without copying it.
    pub async fn status(&self, peer_id: &str) -> Option<Arc<PeerStatus>> {
        self.peers
            .read()
            .await
            .get(peer_id)
            .and_then(|peer| peer.status.clone())
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }

    pub async fn remove(&self, peer_id: &str) -> Result<ActivityEvent, PeerError> {
        let peer = self
            .peers
            .write()
            .await
            .remove(peer_id)
            .ok_or_else(|| PeerError::UnknownPeer(peer_id.to_string()))?;
        Ok(self.record(Activity::PeerRemoved, &peer))
    }

    /// Applies the metadata report.  Reports that carry nothing new leave the
    /// peer untouched and produce no event.
    pub async fn update_meta(
        &self,
        peer_id: &str,
        meta: PeerSystemMeta,
    ) -> Result<Option<ActivityEvent>, PeerError> {
        self.update_peer(peer_id, |peer| {
            if peer.update_meta_if_new(meta) {
                Some(self.record(Activity::PeerMetaUpdated, peer))
            } else {
                debug!("Metadata of peer {} unchanged", peer.id);
                None
            }
        })
        .await
    }

    pub async fn login(&self, peer_id: &str) -> Result<ActivityEvent, PeerError> {
        self.update_peer(peer_id, |peer| {
            peer.update_last_login();
            self.record(Activity::PeerLoggedIn, peer)
        })
        .await
    }

    pub async fn mark_seen(&self, peer_id: &str, connected: bool) -> Result<(), PeerError> {
        self.update_peer(peer_id, |peer| {
            peer.mark_seen(connected, Utc::now());
            if connected && !peer.status.as_ref().is_some_and(|s| s.connected) {
                warn!("Peer {} connected with an expired login", peer.id);
            }
        })
        .await
    }

    /// Routes an update to the matching operation.
    pub async fn apply(&self, update: PeerUpdate) -> Result<Option<ActivityEvent>, PeerError> {
        match update {
            PeerUpdate::Register(new) => self.register(new).await.map(Some),
            PeerUpdate::Meta { peer_id, meta } => self.update_meta(&peer_id, meta).await,
            PeerUpdate::Login { peer_id } => self.login(&peer_id).await.map(Some),
            PeerUpdate::Seen { peer_id, connected } => {
                self.mark_seen(&peer_id, connected).await.map(|_| None)
            }
            PeerUpdate::Remove { peer_id } => self.remove(&peer_id).await.map(Some),
        }
    }

    /// Runs `f` over all peers while holding the write lock.
    pub async fn with_peers_mut<R>(&self, f: impl FnOnce(&mut HashMap<String, Peer>) -> R) -> R {
        let mut peers = self.peers.write().await;
        f(&mut peers)
    }

    /// Runs `f` over all peers while holding the read lock.
    pub async fn with_peers<R>(&self, f: impl FnOnce(&HashMap<String, Peer>) -> R) -> R {
        let peers = self.peers.read().await;
        f(&peers)
    }

    /// Builds the audit event for `peer` and writes it to the log.
    pub fn record(&self, activity: Activity, peer: &Peer) -> ActivityEvent {
        let event = ActivityEvent {
            activity,
            peer_id: peer.id.clone(),
            account_id: peer.account_id.clone(),
            meta: peer.event_meta(&self.settings.dns_domain),
        };
        match serde_json::to_string(&event) {
            Ok(json) => info!("Activity: {}", json),
            Err(e) => warn!("Failed to serialize activity for peer {}: {}", peer.id, e),
        }
        event
    }

    async fn update_peer<R>(
        &self,
        peer_id: &str,
        f: impl FnOnce(&mut Peer) -> R,
    ) -> Result<R, PeerError> {
        let mut peers = self.peers.write().await;
        let peer = peers
            .get_mut(peer_id)
            .ok_or_else(|| PeerError::UnknownPeer(peer_id.to_string()))?;
        Ok(f(peer))
    }
}
