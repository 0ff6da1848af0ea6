//! Peer state for a mesh VPN control plane.
//!
//! The [`peer`] module holds the entity itself: identity, copy-on-write
//! connection status, metadata reconciliation and login expiration.  The
//! remaining modules wire it into a small daemon: configuration, a
//! lock-guarded registry, the expiration sweeper and update sources.

pub mod config;
pub mod dns;
pub mod error;
pub mod expiration;
pub mod peer;
pub mod registry;
pub mod settings;
pub mod source;
pub mod types;
