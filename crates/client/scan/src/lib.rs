//! The ledgerscan pipeline: plan a block window, fetch it concurrently, fold every value transfer into a
//! per-address ledger, then rank the result.
//!
//! [`run_scan`] is the entry point. The building blocks are public so they can be driven piecewise:
//! - [`dispatch`]: one fetch task per block, completions delivered over a channel in arrival order.
//! - [`ledger`]: the aggregator task that owns the [`Ledger`] and serializes every merge.
//! - [`rank`]: ordering and extreme selection once the ledger is complete.

pub mod config;
pub mod dispatch;
pub mod ledger;
pub mod pipeline;
pub mod rank;

#[cfg(test)]
mod tests;

pub use config::{DispatchConfig, FailurePolicy, PacingPolicy, ScanConfig};
pub use dispatch::{Dispatch, Dispatcher, FetchOutcome};
pub use ledger::{AggregatedLedger, AggregationError, Ledger, LedgerAggregator, LedgerHandle, LedgerTask};
pub use pipeline::{run_scan, ScanError, ScanReport};
pub use rank::{rank, select_extremes, Extremes, RankedAddress};
