use super::UpdateSource;
use crate::types::PeerUpdate;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::{mpsc, Mutex};

/// Reads one JSON encoded [`PeerUpdate`] per line.
pub struct JsonLinesSource<R> {
    reader: Mutex<R>,
}

impl<R> JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(reader),
        }
    }
}

impl JsonLinesSource<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R> UpdateSource for JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn monitor(&self, update_tx: mpsc::Sender<PeerUpdate>) -> Result<()> {
        let mut reader = self.reader.lock().await;
        let mut lines = (&mut *reader).lines();
        let mut line_no = 0usize;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<PeerUpdate>(line) {
                Ok(update) => {
                    debug!("Read update for peer {}", update.peer_id());
                    if let Err(e) = update_tx.send(update).await {
                        return Err(anyhow!("Channel closed: {}", e));
                    }
                }
                Err(e) => {
                    warn!("Skipping malformed update on line {}: {}", line_no, e);
                }
            }
        }

        info!("Update stream ended after {} lines", line_no);
        Ok(())
    }
}
