use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use serde_json::Value;

use crate::{parse_transaction, BlockPayload, Transaction};

/// How the receiving side of a transfer is booked.
///
/// [`ReceiverLeg::Debit`] reproduces the historical ledgerscan output, where both legs of a transfer reduce
/// the tracked balance. [`ReceiverLeg::Credit`] books the receiver with `+value`, which yields economic net
/// flows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReceiverLeg {
    #[default]
    Debit,
    Credit,
}

impl FromStr for ReceiverLeg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            other => Err(format!("Invalid receiver leg: {other}. Expected 'debit' or 'credit'.")),
        }
    }
}

impl fmt::Display for ReceiverLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiverLeg::Debit => write!(f, "debit"),
            ReceiverLeg::Credit => write!(f, "credit"),
        }
    }
}

/// The effect of one transaction leg on one tracked address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDelta {
    pub address: String,
    pub amount: BigInt,
}

impl BalanceDelta {
    pub fn new(address: impl Into<String>, amount: impl Into<BigInt>) -> Self {
        Self { address: address.into(), amount: amount.into() }
    }
}

/// All deltas contributed by one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaSet {
    pub deltas: Vec<BalanceDelta>,
    /// Number of transactions that produced deltas.
    pub transfers: usize,
    /// Number of transaction entries that were not value transfers.
    pub skipped: usize,
}

impl DeltaSet {
    pub fn push_transfer(&mut self, tx: Transaction, leg: ReceiverLeg) {
        let value = BigInt::from(tx.value);
        let receiver = match leg {
            ReceiverLeg::Debit => -value.clone(),
            ReceiverLeg::Credit => value.clone(),
        };
        self.deltas.push(BalanceDelta { address: tx.from, amount: -value });
        self.deltas.push(BalanceDelta { address: tx.to, amount: receiver });
        self.transfers += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockParseError {
    #[error("Malformed response: `result` is not a block object")]
    MalformedResponse,
    #[error("Missing transactions: `result.transactions` is absent or not an array")]
    MissingTransactions,
}

/// Converts a raw `eth_getBlockByNumber` response (full transaction objects) into balance deltas.
///
/// Only the block-level shape is fatal. Individual entries that are not value transfers are counted in
/// [`DeltaSet::skipped`] and otherwise ignored.
pub fn parse_block_deltas(payload: &BlockPayload, leg: ReceiverLeg) -> Result<DeltaSet, BlockParseError> {
    let block = payload.get("result").and_then(Value::as_object).ok_or(BlockParseError::MalformedResponse)?;
    let transactions =
        block.get("transactions").and_then(Value::as_array).ok_or(BlockParseError::MissingTransactions)?;

    let mut set = DeltaSet::default();
    for (index, entry) in transactions.iter().enumerate() {
        match parse_transaction(entry) {
            Ok(tx) => set.push_transfer(tx, leg),
            Err(reason) => {
                tracing::trace!(index, %reason, "Skipping transaction");
                set.skipped += 1;
            }
        }
    }
    Ok(set)
}
