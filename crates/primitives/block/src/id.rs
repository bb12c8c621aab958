use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Serialize, Serializer};

/// Parses a JSON-RPC quantity: `0x`-prefixed hexadecimal, or plain decimal.
///
/// Returns `None` for empty digits, a bare `0x`, or any non-digit character.
pub fn parse_quantity(s: &str) -> Option<BigUint> {
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    BigUint::parse_bytes(digits.as_bytes(), radix)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid block identifier: {0:?}")]
pub struct BlockIdParseError(pub String);

/// A block height. Heights use arbitrary precision since some chains exceed native integer widths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(BigUint);

impl BlockId {
    pub fn is_genesis(&self) -> bool {
        self.0.is_zero()
    }

    /// `self - offset`, or `None` when that would go below genesis.
    pub fn checked_sub(&self, offset: u64) -> Option<Self> {
        let offset = BigUint::from(offset);
        (self.0 >= offset).then(|| Self(&self.0 - offset))
    }

    /// Parses `s`, falling back to the genesis identifier when it is malformed. The fallback is logged.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|err: BlockIdParseError| {
            tracing::warn!(input = %s, error = %err, "Malformed block identifier, falling back to 0x0");
            Self::default()
        })
    }
}

impl From<u64> for BlockId {
    fn from(value: u64) -> Self {
        Self(value.into())
    }
}

impl FromStr for BlockId {
    type Err = BlockIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_quantity(s).map(Self).ok_or_else(|| BlockIdParseError(s.to_string()))
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl Serialize for BlockId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
