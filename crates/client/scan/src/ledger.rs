//! Balance aggregation.
//!
//! Parse tasks run concurrently, but the [`Ledger`] itself has a single owner: the aggregator task spawned by
//! [`LedgerAggregator::spawn`]. Everything else talks to it through a [`LedgerHandle`], which serializes all
//! updates through one channel. Every block in the window is settled exactly once, either merged or skipped,
//! and the aggregator only hands the ledger back once all of them have been accounted for.

use std::collections::hash_map::{self, HashMap};

use lp_block::{BalanceDelta, BlockId, DeltaSet};
use lp_utils::AbortOnDrop;
use num_bigint::BigInt;
use tokio::sync::mpsc;

/// Bound on queued ledger commands.
const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Net balance change per address over the scanned window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    balances: HashMap<String, BigInt>,
}

impl Ledger {
    pub fn merge(&mut self, deltas: impl IntoIterator<Item = BalanceDelta>) {
        for BalanceDelta { address, amount } in deltas {
            *self.balances.entry(address).or_default() += amount;
        }
    }

    pub fn balance(&self, address: &str) -> Option<&BigInt> {
        self.balances.get(address)
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, BigInt> {
        self.balances.iter()
    }
}

impl FromIterator<BalanceDelta> for Ledger {
    fn from_iter<I: IntoIterator<Item = BalanceDelta>>(iter: I) -> Self {
        let mut ledger = Self::default();
        ledger.merge(iter);
        ledger
    }
}

impl IntoIterator for Ledger {
    type Item = (String, BigInt);
    type IntoIter = hash_map::IntoIter<String, BigInt>;

    fn into_iter(self) -> Self::IntoIter {
        self.balances.into_iter()
    }
}

/// Final state of the aggregator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedLedger {
    pub ledger: Ledger,
    /// Blocks whose deltas were merged.
    pub merged: usize,
    /// Blocks that were settled without contributing deltas.
    pub skipped: usize,
    /// Transactions that contributed deltas.
    pub transfers: usize,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AggregationError {
    #[error("Ledger closed after {settled} of {expected} blocks were settled")]
    Incomplete { expected: usize, settled: usize },
    #[error("Ledger aggregator is no longer running")]
    Closed,
}

#[derive(Debug)]
enum LedgerCommand {
    Merge { block_id: BlockId, deltas: DeltaSet },
    Skip { block_id: BlockId },
}

/// Sending side of the aggregator. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerCommand>,
}

impl LedgerHandle {
    /// Settles `block_id` by adding its deltas to the ledger.
    pub async fn merge(&self, block_id: BlockId, deltas: DeltaSet) -> Result<(), AggregationError> {
        self.send(LedgerCommand::Merge { block_id, deltas }).await
    }

    /// Settles `block_id` without touching the ledger.
    pub async fn skip(&self, block_id: BlockId) -> Result<(), AggregationError> {
        self.send(LedgerCommand::Skip { block_id }).await
    }

    async fn send(&self, command: LedgerCommand) -> Result<(), AggregationError> {
        self.sender.send(command).await.map_err(|_| AggregationError::Closed)
    }
}

/// Resolves once every expected block has been settled, or every handle has been dropped.
pub type LedgerTask = AbortOnDrop<Result<AggregatedLedger, AggregationError>>;

pub struct LedgerAggregator;

impl LedgerAggregator {
    /// Spawns the aggregator for a window of `expected` blocks. Must be called from within a tokio runtime.
    pub fn spawn(expected: usize) -> (LedgerHandle, LedgerTask) {
        let (sender, receiver) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let task = AbortOnDrop::spawn(aggregate(receiver, expected));
        (LedgerHandle { sender }, task)
    }
}

async fn aggregate(
    mut receiver: mpsc::Receiver<LedgerCommand>,
    expected: usize,
) -> Result<AggregatedLedger, AggregationError> {
    let mut state = AggregatedLedger::default();

    while state.merged + state.skipped < expected {
        let Some(command) = receiver.recv().await else {
            return Err(AggregationError::Incomplete { expected, settled: state.merged + state.skipped });
        };
        match command {
            LedgerCommand::Merge { block_id, deltas } => {
                tracing::trace!(block_id = %block_id, deltas = deltas.deltas.len(), "Merging block deltas");
                state.transfers += deltas.transfers;
                state.ledger.merge(deltas.deltas);
                state.merged += 1;
            }
            LedgerCommand::Skip { block_id } => {
                tracing::trace!(block_id = %block_id, "Settling skipped block");
                state.skipped += 1;
            }
        }
    }

    tracing::debug!(
        merged = state.merged,
        skipped = state.skipped,
        addresses = state.ledger.len(),
        "Ledger aggregation complete"
    );
    Ok(state)
}
