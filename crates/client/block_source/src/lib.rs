//! Block retrieval for ledgerscan.
//!
//! The scan pipeline only needs two capabilities from the chain: learning the current tip, and fetching one
//! block with its full transaction objects. Both are captured by the [`BlockSource`] trait so that the
//! pipeline can be driven by the [`JsonRpcBlockSource`] in production and by in-memory sources in tests.

pub mod error;
pub mod rpc;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use lp_block::{BlockId, BlockPayload};

pub use error::{BlockSourceError, EndpointError};
pub use rpc::{endpoint_with_token, JsonRpcBlockSource, DEFAULT_ENDPOINT};

/// Where blocks come from.
///
/// Implementations must be shareable across tasks: the dispatcher calls [`BlockSource::fetch_block`]
/// concurrently for every block in the scan window.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Returns the highest known block.
    async fn fetch_tip(&self) -> Result<BlockId, BlockSourceError>;

    /// Returns the raw response for `block_id`, envelope included.
    async fn fetch_block(&self, block_id: &BlockId) -> Result<BlockPayload, BlockSourceError>;
}
