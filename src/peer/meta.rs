//! System metadata reported by a peer and its geo location.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Metadata describing the machine a peer runs on.
///
/// Equality covers every field, `ui_version` included.  The special
/// handling of an empty `ui_version` lives in
/// [`Peer::update_meta_if_new`](super::Peer::update_meta_if_new), not here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerSystemMeta {
    pub hostname: String,
    /// Operating system family, e.g. `linux` or `windows`.
    pub os_family: String,
    pub kernel: String,
    pub kernel_version: String,
    pub core: String,
    pub platform: String,
    pub os: String,
    pub os_version: String,
    /// Version of the headless client daemon.
    pub wt_version: String,
    /// Version of the desktop UI.  Headless clients leave it empty.
    pub ui_version: String,
}

impl PeerSystemMeta {
    pub fn is_equal(&self, other: &PeerSystemMeta) -> bool {
        self == other
    }
}

/// Geo location derived from the peer's public connection address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub connection_ip: Option<IpAddr>,
    pub country_code: String,
    pub city_name: String,
    /// City level geoname id.
    pub geoname_id: u32,
}
