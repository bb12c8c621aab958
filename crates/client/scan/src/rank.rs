use std::cmp::Ordering;

use num_bigint::BigInt;

use crate::ledger::Ledger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedAddress {
    pub address: String,
    pub balance: BigInt,
}

impl RankedAddress {
    pub fn new(address: impl Into<String>, balance: impl Into<BigInt>) -> Self {
        Self { address: address.into(), balance: balance.into() }
    }
}

/// The address(es) with the most extreme net movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extremes {
    /// No value transfer was seen in the window.
    Empty,
    Single(RankedAddress),
    /// The most negative and most positive balances have the same magnitude.
    Tied { min: RankedAddress, max: RankedAddress },
}

/// Orders the ledger by balance descending. Equal balances are ordered by address ascending.
pub fn rank(ledger: &Ledger) -> Vec<RankedAddress> {
    let mut ranked: Vec<_> =
        ledger.iter().map(|(address, balance)| RankedAddress::new(address.clone(), balance.clone())).collect();
    ranked.sort_unstable_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.address.cmp(&b.address)));
    ranked
}

/// Compares the magnitudes of the first (max) and last (min) entries of a [`rank`]ed sequence.
pub fn select_extremes(ranked: &[RankedAddress]) -> Extremes {
    let (Some(max), Some(min)) = (ranked.first(), ranked.last()) else {
        return Extremes::Empty;
    };
    // One entry is both min and max; it is reported once rather than as a tie with itself.
    if ranked.len() == 1 {
        return Extremes::Single(max.clone());
    }

    match max.balance.magnitude().cmp(min.balance.magnitude()) {
        Ordering::Greater => Extremes::Single(max.clone()),
        Ordering::Less => Extremes::Single(min.clone()),
        Ordering::Equal => Extremes::Tied { min: min.clone(), max: max.clone() },
    }
}
