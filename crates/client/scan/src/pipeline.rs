use std::sync::Arc;
use std::time::Duration;

use lc_block_source::{BlockSource, BlockSourceError};
use lp_block::{parse_block_deltas, plan_window, BlockId, BlockPayload, ReceiverLeg};
use lp_utils::{stopwatch_end, PerfStopwatch};
use tokio::task::{JoinError, JoinSet};

use crate::config::{FailurePolicy, ScanConfig};
use crate::dispatch::{Dispatcher, FetchOutcome};
use crate::ledger::{AggregationError, LedgerAggregator, LedgerHandle};
use crate::rank::{rank, select_extremes, Extremes, RankedAddress};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Failed to fetch the chain tip: {0}")]
    Tip(#[source] BlockSourceError),
    #[error("Failed to fetch block {block_id}: {source}")]
    Fetch {
        block_id: BlockId,
        #[source]
        source: BlockSourceError,
    },
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    #[error("Block parse task failed: {0}")]
    ParseTask(#[from] JoinError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub tip: BlockId,
    pub blocks_planned: usize,
    /// Blocks whose deltas reached the ledger.
    pub blocks_scanned: usize,
    pub blocks_skipped: usize,
    pub transfers: usize,
    pub ranked: Vec<RankedAddress>,
    pub extremes: Extremes,
    /// Wall-clock time from the tip request to the ranking.
    pub elapsed: Duration,
}

/// Scans the `config.window_size` most recent blocks of `source` and ranks the addresses they touch.
///
/// Blocks are fetched concurrently and their deltas merged in completion order. The ranking is only computed
/// once every planned block has been settled.
pub async fn run_scan(source: Arc<dyn BlockSource>, config: &ScanConfig) -> Result<ScanReport, ScanError> {
    let stopwatch = PerfStopwatch::new();

    let tip = source.fetch_tip().await.map_err(ScanError::Tip)?;
    let block_ids = plan_window(&tip, config.window_size);
    let blocks_planned = block_ids.len();
    tracing::info!(tip = %tip, blocks = blocks_planned, receiver_leg = %config.receiver_leg, "Scanning block window");

    let (ledger, ledger_task) = LedgerAggregator::spawn(blocks_planned);
    let mut dispatch = Dispatcher::new(source, config.dispatch.clone()).dispatch(block_ids);
    let mut parse_tasks = JoinSet::new();

    while let Some(FetchOutcome { block_id, result }) = dispatch.recv().await {
        match result {
            Ok(payload) => {
                parse_tasks.spawn(settle_block(ledger.clone(), block_id, payload, config.receiver_leg));
            }
            Err(source) => match config.failure_policy {
                FailurePolicy::FailFast => {
                    tracing::error!(block_id = %block_id, error = %source, "Block fetch failed, aborting scan");
                    return Err(ScanError::Fetch { block_id, source });
                }
                FailurePolicy::SkipFailedBlocks => {
                    tracing::warn!(block_id = %block_id, error = %source, "Block fetch failed, skipping block");
                    ledger.skip(block_id).await?;
                }
            },
        }
    }

    while let Some(joined) = parse_tasks.join_next().await {
        joined??;
    }
    drop(ledger);

    let aggregated = ledger_task.await?;
    let ranked = rank(&aggregated.ledger);
    let extremes = select_extremes(&ranked);
    stopwatch_end!(stopwatch, "Scan of {} blocks done in {:?}", blocks_planned);

    Ok(ScanReport {
        tip,
        blocks_planned,
        blocks_scanned: aggregated.merged,
        blocks_skipped: aggregated.skipped,
        transfers: aggregated.transfers,
        ranked,
        extremes,
        elapsed: stopwatch.elapsed(),
    })
}

async fn settle_block(
    ledger: LedgerHandle,
    block_id: BlockId,
    payload: BlockPayload,
    leg: ReceiverLeg,
) -> Result<(), AggregationError> {
    match parse_block_deltas(&payload, leg) {
        Ok(deltas) => {
            tracing::debug!(
                block_id = %block_id,
                transfers = deltas.transfers,
                skipped = deltas.skipped,
                "Parsed block"
            );
            ledger.merge(block_id, deltas).await
        }
        Err(e) => {
            tracing::warn!(block_id = %block_id, error = %e, "Unusable block payload, skipping block");
            ledger.skip(block_id).await
        }
    }
}
