//! Read-side views: portfolio valuation, transaction history, quote lookup.
//!
//! Views read only committed ledger state and never mutate anything, so they
//! take no user lock and run in parallel with trades.

use crate::domain::errors::ViewError;
use crate::domain::portfolio::{Portfolio, Position, PositionValue, aggregate_holdings};
use crate::domain::ports::QuoteSource;
use crate::domain::repositories::LedgerStore;
use crate::domain::types::{LedgerEntry, Quote, UserId};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::warn;

pub struct PortfolioService {
    ledger: Arc<dyn LedgerStore>,
    quotes: Arc<dyn QuoteSource>,
}

impl PortfolioService {
    pub fn new(ledger: Arc<dyn LedgerStore>, quotes: Arc<dyn QuoteSource>) -> Self {
        Self { ledger, quotes }
    }

    /// Derive the current portfolio: fold the ledger into holdings, quote
    /// each open symbol once, total = cash + sum of quoted position values.
    ///
    /// Entries and cash are two separate committed reads, not one snapshot;
    /// a trade landing between them can show the newer balance against the
    /// older entry list. Both values are always committed state.
    pub async fn get_portfolio(&self, user_id: UserId) -> Result<Portfolio, ViewError> {
        let entries = self.ledger.entries_for(user_id).await?;
        let cash = self.ledger.cash(user_id).await?;
        let holdings = aggregate_holdings(&entries);

        let mut positions = Vec::with_capacity(holdings.len());
        let mut total = cash;

        for (symbol, holding) in holdings {
            let value = match self.quotes.lookup(&symbol).await? {
                Some(quote) => {
                    let value = quote.price * Decimal::from(holding.quantity);
                    total += value;
                    PositionValue::Quoted {
                        price: quote.price,
                        value,
                    }
                }
                None => {
                    // Historically tradable symbol no longer quoted: keep the
                    // position visible, flagged, with no contribution to total.
                    warn!(user_id, %symbol, "held symbol no longer quoted");
                    PositionValue::Unlisted
                }
            };

            positions.push(Position {
                symbol,
                name: holding.name,
                shares: holding.quantity,
                value,
            });
        }

        Ok(Portfolio {
            cash,
            positions,
            total,
        })
    }

    /// Full transaction history, ascending by time.
    pub async fn get_history(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, ViewError> {
        Ok(self.ledger.entries_for(user_id).await?)
    }

    /// Standalone quote lookup, same bounded-timeout semantics as trades.
    /// `Ok(None)` for an unknown or empty symbol.
    pub async fn quote(&self, symbol: &str) -> Result<Option<Quote>, ViewError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Ok(None);
        }
        Ok(self.quotes.lookup(&symbol).await?)
    }
}
