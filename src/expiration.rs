//! Peer login expiration sweeps.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use crate::registry::{Activity, ActivityEvent, PeerRegistry};

/// Marks every peer whose login expired as of `now` and that is not marked
/// yet.  Returns one event per newly expired peer.
pub async fn expire_peers(registry: &PeerRegistry, now: DateTime<Utc>) -> Vec<ActivityEvent> {
    let settings = registry.settings();
    registry
        .with_peers_mut(|peers| {
            let mut events = Vec::new();
            for peer in peers.values_mut() {
                let Some(status) = peer.status.as_deref() else {
                    warn!("Peer {} has no status, skipping expiration check", peer.id);
                    continue;
                };
                if status.login_expired {
                    continue;
                }
                let (expired, time_left) = settings.peer_login_expired_at(peer, now);
                if !expired {
                    continue;
                }
                debug!(
                    "Peer {} login expired {}s ago",
                    peer.id,
                    -time_left.num_seconds()
                );
                peer.mark_login_expired(true);
                events.push(registry.record(Activity::PeerLoginExpired, peer));
            }
            events
        })
        .await
}

/// Time until the next peer login expires, if any peer is due to expire.
pub async fn next_expiration(registry: &PeerRegistry, now: DateTime<Utc>) -> Option<Duration> {
    let settings = registry.settings();
    registry
        .with_peers(|peers| {
            peers
                .values()
                .filter(|peer| peer.status.as_deref().is_some_and(|s| !s.login_expired))
                .filter_map(|peer| {
                    let (expired, time_left) = settings.peer_login_expired_at(peer, now);
                    (!expired && time_left > Duration::zero()).then_some(time_left)
                })
                .min()
        })
        .await
}

/// Sweeps expired logins forever, sleeping until the next peer is due.
///
/// With nothing pending the loop sleeps a full expiration period.  Peers
/// already due are marked on registration and a later login cannot expire
/// sooner than one period after it, so nothing is missed while asleep.
pub async fn run_expiration_loop(registry: PeerRegistry, floor: std::time::Duration) {
    let period = registry.settings().peer_login_expiration;
    if !registry.settings().peer_login_expiration_enabled {
        info!("Peer login expiration disabled for the account");
    }
    loop {
        let now = Utc::now();
        let expired = expire_peers(&registry, now).await;
        if !expired.is_empty() {
            info!("Marked {} peer login(s) as expired", expired.len());
        }

        let wait = next_expiration(&registry, now)
            .await
            .unwrap_or(period)
            .to_std()
            .unwrap_or(floor)
            .max(floor);
        debug!("Next expiration check in {:?}", wait);
        tokio::time::sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::NewPeer;
    use crate::settings::Settings;
    use chrono::TimeZone;

    fn settings() -> Settings {
        Settings {
            dns_domain: "mesh.internal".into(),
            peer_login_expiration_enabled: true,
            peer_login_expiration: Duration::hours(1),
        }
    }

    fn new_peer(id: &str, user_id: &str) -> NewPeer {
        NewPeer {
            id: id.into(),
            account_id: "acc".into(),
            key: format!("{}-key", id),
            setup_key: String::new(),
            ip: "100.64.0.9".parse().unwrap(),
            name: id.into(),
            dns_label: None,
            user_id: user_id.into(),
            ssh_key: String::new(),
            ssh_enabled: false,
            login_expiration_enabled: true,
            ephemeral: false,
        }
    }

    async fn registry_with_logins(t0: DateTime<Utc>, settings: Settings) -> PeerRegistry {
        let registry = PeerRegistry::new(settings);
        for (id, user, login) in [
            ("stale", "u1", t0),
            ("fresh", "u2", t0 + Duration::minutes(40)),
            ("headless", "", t0),
        ] {
            registry.register(new_peer(id, user)).await.unwrap();
            registry
                .with_peers_mut(|peers| {
                    peers.get_mut(id).unwrap().update_last_login_at(login);
                })
                .await;
        }
        registry
    }

    #[tokio::test]
    async fn expires_only_due_sso_peers_once() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let registry = registry_with_logins(t0, settings()).await;
        registry.mark_seen("stale", true).await.unwrap();
        let now = t0 + Duration::minutes(90);

        let events = expire_peers(&registry, now).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].peer_id, "stale");
        assert_eq!(events[0].activity, Activity::PeerLoginExpired);
        assert_eq!(events[0].meta["fqdn"], "stale.mesh.internal");

        let status = registry.status("stale").await.unwrap();
        assert!(status.login_expired);
        assert!(!status.connected);
        assert!(!registry.status("headless").await.unwrap().login_expired);

        assert!(expire_peers(&registry, now).await.is_empty());
    }

    #[tokio::test]
    async fn next_expiration_picks_the_soonest_pending_peer() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let registry = registry_with_logins(t0, settings()).await;

        let next = next_expiration(&registry, t0 + Duration::minutes(30)).await;
        assert_eq!(next, Some(Duration::minutes(30)));

        let next = next_expiration(&registry, t0 + Duration::minutes(90)).await;
        assert_eq!(next, Some(Duration::minutes(10)));
    }

    #[tokio::test]
    async fn disabled_account_expires_nobody() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let settings = Settings {
            peer_login_expiration_enabled: false,
            ..settings()
        };
        let registry = registry_with_logins(t0, settings).await;
        let now = t0 + Duration::days(1);

        assert!(expire_peers(&registry, now).await.is_empty());
        assert_eq!(next_expiration(&registry, now).await, None);
    }

    #[tokio::test]
    async fn relogin_rearms_expiration() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let registry = registry_with_logins(t0, settings()).await;
        let later = t0 + Duration::hours(3);
        expire_peers(&registry, later).await;

        registry
            .with_peers_mut(|peers| {
                peers.get_mut("stale").unwrap().update_last_login_at(later);
            })
            .await;
        assert!(!registry.status("stale").await.unwrap().login_expired);
        assert_eq!(
            next_expiration(&registry, later).await,
            Some(Duration::hours(1))
        );
    }

    #[tokio::test]
    async fn peer_registered_while_idle_is_marked_at_once() {
        let registry = PeerRegistry::new(settings());
        let now = Utc::now();
        assert!(expire_peers(&registry, now).await.is_empty());
        assert_eq!(next_expiration(&registry, now).await, None);

        registry.register(new_peer("late", "u9")).await.unwrap();

        assert!(registry.status("late").await.unwrap().login_expired);
        assert!(expire_peers(&registry, Utc::now()).await.is_empty());
        assert_eq!(next_expiration(&registry, Utc::now()).await, None);
    }
}
