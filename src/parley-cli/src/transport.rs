//! Simulated transport that replays a text as a chunked model response.

use std::time::Duration;

use anyhow::{Result, bail};
use parley_stream::{DriverHandle, StreamSignal};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Replays `text` in fixed-size chunks with a delay between them.
#[derive(Debug, Clone)]
pub struct SimulatedTransport {
    chunks: Vec<String>,
    delay: Duration,
    fail_after: Option<usize>,
}

impl SimulatedTransport {
    pub fn new(text: &str, chunk_size: usize, delay: Duration) -> Self {
        Self {
            chunks: split_chunks(text, chunk_size),
            delay,
            fail_after: None,
        }
    }

    /// Emits an error signal after `count` chunks instead of finishing.
    pub fn with_failure_after(mut self, count: Option<usize>) -> Self {
        self.fail_after = count;
        self
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Streams every chunk into the driver.
    ///
    /// Attaches a fresh abort handle first; if the engine cancels it the
    /// replay stops without sending a finish signal, because the engine has
    /// already produced its own `Cancelled`.
    pub async fn run(self, handle: DriverHandle) -> Result<()> {
        let token = CancellationToken::new();
        if !handle.attach_abort_handle(token.clone()) {
            bail!("driver stopped before the request was sent");
        }

        let conversation_id = Uuid::new_v4().to_string();
        let message_id = Uuid::new_v4().to_string();
        info!(%conversation_id, chunks = self.chunks.len(), "Replaying response");

        handle.signal(StreamSignal::Sent);
        handle.signal(StreamSignal::ConversationBound {
            id: conversation_id,
        });

        for (index, chunk) in self.chunks.into_iter().enumerate() {
            if self.fail_after == Some(index) {
                handle.signal(StreamSignal::error(format!(
                    "simulated transport failure after {index} chunks"
                )));
                return Ok(());
            }

            tokio::select! {
                _ = token.cancelled() => {
                    debug!(index, "Replay cancelled");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.delay) => {}
            }

            if index == 0 {
                handle.signal(StreamSignal::MessageBound {
                    id: message_id.clone(),
                });
            }
            if !handle.signal(StreamSignal::chunk(chunk)) {
                bail!("driver stopped mid-stream");
            }
        }

        if token.is_cancelled() {
            return Ok(());
        }
        handle.signal(StreamSignal::Done);
        Ok(())
    }
}

/// Splits `text` into pieces of at most `size` characters. A zero size is
/// treated as one.
pub fn split_chunks(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == size {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
