//! Block-level primitives shared by the ledgerscan crates.
//!
//! - [`BlockId`]: a block height in the `0x`-prefixed hexadecimal form expected by JSON-RPC endpoints.
//! - [`window`]: plans the contiguous range of blocks to scan, counting backward from the tip.
//! - [`transaction`]: the value-transfer view of one entry of a block's transaction list.
//! - [`delta`]: turns a raw block payload into signed per-address balance deltas.

pub mod delta;
pub mod id;
pub mod transaction;
pub mod window;

pub use delta::{parse_block_deltas, BalanceDelta, BlockParseError, DeltaSet, ReceiverLeg};
pub use id::{parse_quantity, BlockId, BlockIdParseError};
pub use transaction::{parse_transaction, Transaction, TransactionSkip};
pub use window::{plan_window, plan_window_from_str};

/// Raw JSON-RPC response body for one block, including the envelope.
pub type BlockPayload = serde_json::Value;
