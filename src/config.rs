use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Longest login expiration an account may configure: 180 days.
pub const MAX_PEER_LOGIN_EXPIRATION_SECS: u64 = 180 * 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Account DNS domain appended to peer labels.  Empty disables FQDNs.
    pub dns_domain: String,
    /// Account-wide switch for peer login expiration.
    pub peer_login_expiration_enabled: bool,
    /// How long an SSO login stays valid, in seconds.
    pub peer_login_expiration_secs: u64,
    /// Lower bound between two expiration sweeps, in seconds.
    pub expiration_check_floor_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dns_domain: String::new(),
            peer_login_expiration_enabled: true,
            // 24 hours
            peer_login_expiration_secs: 24 * 60 * 60,
            expiration_check_floor_secs: 60,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_figment(Self::figment())
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("meshpeer.toml"))
            .merge(Json::file("meshpeer.json"))
            .merge(Env::prefixed("MESHPEER_"))
    }

    fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let mut config: Config = figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        // Support Docker-style secrets
        if let Ok(domain_file) = std::env::var("MESHPEER_DNS_DOMAIN_FILE") {
            config.dns_domain = std::fs::read_to_string(domain_file)?.trim().to_string();
        }

        if !(1..=MAX_PEER_LOGIN_EXPIRATION_SECS).contains(&config.peer_login_expiration_secs) {
            anyhow::bail!(
                "peer_login_expiration_secs must be between 1 and {}",
                MAX_PEER_LOGIN_EXPIRATION_SECS
            );
        }
        if config.expiration_check_floor_secs == 0 {
            anyhow::bail!("expiration_check_floor_secs must be greater than zero");
        }

        Ok(config)
    }
}
