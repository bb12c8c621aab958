//! Concurrent block retrieval.
//!
//! [`Dispatcher::dispatch`] launches one task per planned block. Every task publishes exactly one
//! [`FetchOutcome`] on a completion channel sized to the whole window, so publishing never waits on the
//! consumer. Completions arrive in whatever order the endpoint answers.

use std::sync::Arc;
use std::time::Duration;

use lc_block_source::{BlockSource, BlockSourceError};
use lp_block::{BlockId, BlockPayload};
use lp_utils::AbortOnDrop;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use crate::config::DispatchConfig;

#[derive(Debug)]
pub struct FetchOutcome {
    pub block_id: BlockId,
    pub result: Result<BlockPayload, BlockSourceError>,
}

pub struct Dispatcher {
    source: Arc<dyn BlockSource>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(source: Arc<dyn BlockSource>, config: DispatchConfig) -> Self {
        Self { source, config }
    }

    /// Starts fetching `block_ids`. Must be called from within a tokio runtime.
    pub fn dispatch(&self, block_ids: Vec<BlockId>) -> Dispatch {
        let expected = block_ids.len();
        let (sender, receiver) = mpsc::channel(expected.max(1));
        let driver = AbortOnDrop::spawn(drive(Arc::clone(&self.source), self.config.clone(), block_ids, sender));
        Dispatch { receiver, expected, _driver: driver }
    }
}

/// A running dispatch. Dropping it aborts every fetch still in flight.
pub struct Dispatch {
    receiver: mpsc::Receiver<FetchOutcome>,
    expected: usize,
    _driver: AbortOnDrop<()>,
}

impl Dispatch {
    /// Next completed fetch, or `None` once every fetch task has finished.
    pub async fn recv(&mut self) -> Option<FetchOutcome> {
        self.receiver.recv().await
    }

    /// Number of fetches this dispatch was started with.
    pub fn expected(&self) -> usize {
        self.expected
    }
}

async fn drive(
    source: Arc<dyn BlockSource>,
    config: DispatchConfig,
    block_ids: Vec<BlockId>,
    sender: mpsc::Sender<FetchOutcome>,
) {
    let limiter = config.max_concurrent_fetches.map(|n| Arc::new(Semaphore::new(n.get())));
    // Dropping the set (when the driver is aborted) aborts the fetch tasks as well.
    let mut tasks = JoinSet::new();

    for (launched, block_id) in block_ids.into_iter().enumerate() {
        if config.pacing.should_pause_before(launched) {
            tracing::debug!(launched, pause = ?config.pacing.pause, "Pacing dispatch burst");
            tokio::time::sleep(config.pacing.pause).await;
        }

        let source = Arc::clone(&source);
        let sender = sender.clone();
        let limiter = limiter.clone();
        let timeout = config.fetch_timeout;
        tasks.spawn(async move {
            let _permit = match limiter {
                Some(limiter) => limiter.acquire_owned().await.ok(),
                None => None,
            };
            let result = fetch_block(source.as_ref(), &block_id, timeout).await;
            if let Err(e) = &result {
                tracing::debug!(block_id = %block_id, error = %e, error_type = e.error_type(), "Block fetch failed");
            }
            // The receiver only goes away when the scan has been abandoned.
            let _ = sender.send(FetchOutcome { block_id, result }).await;
        });
    }
    drop(sender);

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            if e.is_panic() {
                tracing::error!(error = %e, "Block fetch task panicked");
            }
        }
    }
}

async fn fetch_block(
    source: &dyn BlockSource,
    block_id: &BlockId,
    timeout: Option<Duration>,
) -> Result<BlockPayload, BlockSourceError> {
    match timeout {
        Some(after) => tokio::time::timeout(after, source.fetch_block(block_id))
            .await
            .unwrap_or_else(|_| Err(BlockSourceError::Timeout { block_id: block_id.clone(), after })),
        None => source.fetch_block(block_id).await,
    }
}
