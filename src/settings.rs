//! Account-level settings that feed the peer computations.

use chrono::{DateTime, Duration, Utc};

use crate::config::{Config, MAX_PEER_LOGIN_EXPIRATION_SECS};
use crate::peer::Peer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub dns_domain: String,
    /// When off, no peer of the account expires whatever its own flag says.
    pub peer_login_expiration_enabled: bool,
    pub peer_login_expiration: Duration,
}

impl Settings {
    /// Returns the login expiry state of `peer` under these settings.
    pub fn peer_login_expired(&self, peer: &Peer) -> (bool, Duration) {
        self.peer_login_expired_at(peer, Utc::now())
    }

    pub fn peer_login_expired_at(&self, peer: &Peer, now: DateTime<Utc>) -> (bool, Duration) {
        if !self.peer_login_expiration_enabled {
            return (false, Duration::zero());
        }
        peer.login_expired_at(self.peer_login_expiration, now)
    }
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            dns_domain: config.dns_domain.clone(),
            peer_login_expiration_enabled: config.peer_login_expiration_enabled,
            peer_login_expiration: Duration::seconds(
                config
                    .peer_login_expiration_secs
                    .min(MAX_PEER_LOGIN_EXPIRATION_SECS) as i64,
            ),
        }
    }
}
