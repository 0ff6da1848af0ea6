use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeerError {
    #[error("peer id must not be empty")]
    MissingId,
    #[error("peer {peer_id} has no account id")]
    MissingAccountId { peer_id: String },
    #[error("peer {0} not found")]
    UnknownPeer(String),
    #[error("peer {0} is already registered")]
    AlreadyRegistered(String),
}
