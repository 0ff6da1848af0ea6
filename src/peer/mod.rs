//! The peer entity: a machine connected to the mesh network, identified by
//! its WireGuard public key.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dns;
use crate::error::PeerError;

pub mod meta;
pub mod status;

pub use meta::{Location, PeerSystemMeta};
pub use status::PeerStatus;

/// Registration data handed over by whoever admits a peer into an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPeer {
    pub id: String,
    pub account_id: String,
    pub key: String,
    #[serde(default)]
    pub setup_key: String,
    pub ip: IpAddr,
    #[serde(default)]
    pub name: String,
    /// Derived from `name` when not given.
    #[serde(default)]
    pub dns_label: Option<String>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub ssh_key: String,
    #[serde(default)]
    pub ssh_enabled: bool,
    #[serde(default)]
    pub login_expiration_enabled: bool,
    #[serde(default)]
    pub ephemeral: bool,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub id: String,
    /// Account this peer belongs to.
    pub account_id: String,
    /// WireGuard public key.
    pub key: String,
    /// Setup key the peer was registered with.
    pub setup_key: String,
    pub ip: IpAddr,
    pub meta: PeerSystemMeta,
    /// Machine name.
    pub name: String,
    /// Label used to form the FQDN by appending the account's domain,
    /// e.g. `peer-label.mesh.internal`.
    pub dns_label: String,
    /// Current management connection status.  Replaced, never mutated.
    pub status: Option<Arc<PeerStatus>>,
    /// The user that registered the peer through an interactive login.
    pub user_id: String,
    pub ssh_key: String,
    pub ssh_enabled: bool,
    /// Once expired, the peer has to log in again.  Works with `last_login`.
    pub login_expiration_enabled: bool,
    pub last_login: DateTime<Utc>,
    pub ephemeral: bool,
    pub location: Location,
}

impl Peer {
    /// Builds a freshly registered peer with an initial status snapshot and
    /// empty metadata.
    pub fn new(new: NewPeer) -> Result<Peer, PeerError> {
        if new.id.is_empty() {
            return Err(PeerError::MissingId);
        }
        if new.account_id.is_empty() {
            return Err(PeerError::MissingAccountId { peer_id: new.id });
        }
        let dns_label = match new.dns_label {
            Some(label) if !label.is_empty() => label,
            _ => dns::parse_label(&new.name),
        };
        Ok(Peer {
            id: new.id,
            account_id: new.account_id,
            key: new.key,
            setup_key: new.setup_key,
            ip: new.ip,
            meta: PeerSystemMeta::default(),
            name: new.name,
            dns_label,
            status: Some(Arc::new(PeerStatus::default())),
            user_id: new.user_id,
            ssh_key: new.ssh_key,
            ssh_enabled: new.ssh_enabled,
            login_expiration_enabled: new.login_expiration_enabled,
            last_login: DateTime::<Utc>::default(),
            ephemeral: new.ephemeral,
            location: Location::default(),
        })
    }

    /// Whether the peer was added by a user through an interactive SSO login.
    pub fn added_with_sso_login(&self) -> bool {
        !self.user_id.is_empty()
    }

    /// Replaces the system metadata when the report carries new information.
    ///
    /// A report without a UI version (sent by the headless client alone)
    /// keeps the UI version already on record.  Returns `true` if the stored
    /// metadata changed.
    pub fn update_meta_if_new(&mut self, mut meta: PeerSystemMeta) -> bool {
        if meta.ui_version.is_empty() {
            meta.ui_version = self.meta.ui_version.clone();
        }

        if self.meta.is_equal(&meta) {
            return false;
        }
        self.meta = meta;
        true
    }

    /// Installs a new status snapshot with the login marked expired or not.
    ///
    /// # Panics
    ///
    /// Panics if the peer has no status.  Every registered peer carries one.
    pub fn mark_login_expired(&mut self, expired: bool) {
        let next = self.current_status().with_login_expired(expired);
        self.status = Some(next);
    }

    /// Records a successful login now and clears the expired flag.
    ///
    /// # Panics
    ///
    /// Panics if the peer has no status.
    pub fn update_last_login(&mut self) -> &mut Self {
        self.update_last_login_at(Utc::now())
    }

    pub fn update_last_login_at(&mut self, now: DateTime<Utc>) -> &mut Self {
        let next = self.current_status().with_login_expired(false);
        self.last_login = now;
        self.status = Some(next);
        self
    }

    /// Installs a new status snapshot after a connectivity report.
    ///
    /// # Panics
    ///
    /// Panics if the peer has no status.
    pub fn mark_seen(&mut self, connected: bool, now: DateTime<Utc>) {
        let next = self.current_status().with_connected(connected, now);
        self.status = Some(next);
    }

    /// Reports whether the login has expired and the time left until it does.
    ///
    /// The time left is negative once expired and tells how long ago that
    /// happened.  Peers that were not added with an SSO login, or that opted
    /// out of expiration, never expire.
    pub fn login_expired(&self, expires_in: Duration) -> (bool, Duration) {
        self.login_expired_at(expires_in, Utc::now())
    }

    pub fn login_expired_at(&self, expires_in: Duration, now: DateTime<Utc>) -> (bool, Duration) {
        if !self.added_with_sso_login() || !self.login_expiration_enabled {
            return (false, Duration::zero());
        }
        // Past chrono's date range the login outlives any clock reading.
        let Some(expires_at) = self.last_login.checked_add_signed(expires_in) else {
            return (false, expires_in);
        };
        let time_left = expires_at - now;
        (time_left <= Duration::zero(), time_left)
    }

    /// Returns the peer's FQDN, or an empty string when no domain is set.
    pub fn fqdn(&self, dns_domain: &str) -> String {
        if dns_domain.is_empty() {
            return String::new();
        }
        format!("{}.{}", self.dns_label, dns_domain)
    }

    /// Activity event metadata describing this peer.
    pub fn event_meta(&self, dns_domain: &str) -> Map<String, Value> {
        let mut meta = Map::new();
        meta.insert("name".into(), Value::String(self.name.clone()));
        meta.insert("fqdn".into(), Value::String(self.fqdn(dns_domain)));
        meta.insert("ip".into(), Value::String(self.ip.to_string()));
        meta
    }

    fn current_status(&self) -> &PeerStatus {
        self.status
            .as_deref()
            .expect("peer status must be initialized before login transitions")
    }
}

/// Deep copy: the status snapshot is duplicated, never shared, so the copy
/// can be handed out while the original keeps changing.
impl Clone for Peer {
    fn clone(&self) -> Self {
        Peer {
            id: self.id.clone(),
            account_id: self.account_id.clone(),
            key: self.key.clone(),
            setup_key: self.setup_key.clone(),
            ip: self.ip,
            meta: self.meta.clone(),
            name: self.name.clone(),
            dns_label: self.dns_label.clone(),
            status: self.status.as_deref().map(|s| Arc::new(s.copy())),
            user_id: self.user_id.clone(),
            ssh_key: self.ssh_key.clone(),
            ssh_enabled: self.ssh_enabled,
            login_expiration_enabled: self.login_expiration_enabled,
            last_login: self.last_login,
            ephemeral: self.ephemeral,
            location: self.location.clone(),
        }
    }
}
