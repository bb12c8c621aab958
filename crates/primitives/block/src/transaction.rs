use num_bigint::BigUint;
use num_traits::Zero;
use serde_json::Value;

use crate::parse_quantity;

/// A value transfer extracted from a block's transaction list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub from: String,
    pub to: String,
    pub value: BigUint,
}

/// Why a transaction entry does not count as a value transfer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionSkip {
    #[error("transaction entry is not an object")]
    NotAnObject,
    #[error("missing or non-string field `{0}`")]
    MissingField(&'static str),
    #[error("unparseable value {0:?}")]
    InvalidValue(String),
    #[error("zero value")]
    ZeroValue,
}

fn string_field<'a>(
    entry: &'a serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, TransactionSkip> {
    entry.get(field).and_then(Value::as_str).ok_or(TransactionSkip::MissingField(field))
}

/// Reads one entry of `result.transactions`.
///
/// Contract creations carry `"to": null` and are therefore skipped like any other missing field.
pub fn parse_transaction(entry: &Value) -> Result<Transaction, TransactionSkip> {
    let entry = entry.as_object().ok_or(TransactionSkip::NotAnObject)?;
    let from = string_field(entry, "from")?;
    let to = string_field(entry, "to")?;
    let raw_value = string_field(entry, "value")?;

    let value = parse_quantity(raw_value).ok_or_else(|| TransactionSkip::InvalidValue(raw_value.to_string()))?;
    if value.is_zero() {
        return Err(TransactionSkip::ZeroValue);
    }

    Ok(Transaction { from: from.to_string(), to: to.to_string(), value })
}
