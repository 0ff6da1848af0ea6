use crate::types::PeerUpdate;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

pub mod json_lines;
pub use json_lines::JsonLinesSource;

#[async_trait]
pub trait UpdateSource {
    /// Start reading peer updates from the source.
    /// Updates should be sent to the provided channel.
    async fn monitor(&self, update_tx: mpsc::Sender<PeerUpdate>) -> Result<()>;
}
