//! Read-side aggregation: fold the ledger into current holdings.
//!
//! Pure functions, decoupled from storage and from the quote source so the
//! aggregation pass is unit-testable on its own. Symbol order is always the
//! BTreeMap order, so repeated calls over the same entries are deterministic.

use crate::domain::types::LedgerEntry;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Accumulated position for one symbol. `name` is the latest company-name
/// snapshot seen in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holding {
    pub name: String,
    pub quantity: i64,
}

/// Single aggregation pass over a user's entries, ascending order assumed.
/// Fully closed positions (sum == 0) are dropped: they must not appear in
/// any portfolio view.
pub fn aggregate_holdings(entries: &[LedgerEntry]) -> BTreeMap<String, Holding> {
    let mut holdings: BTreeMap<String, Holding> = BTreeMap::new();

    for entry in entries {
        let acc = holdings
            .entry(entry.symbol.clone())
            .or_insert_with(|| Holding {
                name: entry.name.clone(),
                quantity: 0,
            });
        acc.quantity += entry.quantity;
        acc.name = entry.name.clone();
    }

    holdings.retain(|_, acc| acc.quantity != 0);
    holdings
}

/// Current share count for one symbol (0 when the position is closed or absent).
pub fn holding_for(entries: &[LedgerEntry], symbol: &str) -> i64 {
    entries
        .iter()
        .filter(|e| e.symbol == symbol)
        .map(|e| e.quantity)
        .sum()
}

/// Valuation of one open position. A symbol the quote source no longer knows
/// (delisting) stays listed, flagged rather than silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PositionValue {
    Quoted { price: Decimal, value: Decimal },
    Unlisted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub symbol: String,
    pub name: String,
    pub shares: i64,
    pub value: PositionValue,
}

/// Derived portfolio view. `total` is cash plus the sum of quoted position
/// values; unlisted positions contribute nothing to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Portfolio {
    pub cash: Decimal,
    pub positions: Vec<Position>,
    pub total: Decimal,
}

impl Portfolio {
    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.symbol == symbol)
    }
}
