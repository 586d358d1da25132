//! Buy/sell execution: validate, authorize, commit.
//!
//! Each operation runs as a single atomic unit: the user's lock is held from
//! the first balance/holdings read through the ledger commit, and the commit
//! itself (cash update + entry append) is one storage transaction.

use crate::application::user_locks::UserLocks;
use crate::domain::errors::{QuoteError, TradeError};
use crate::domain::portfolio::holding_for;
use crate::domain::ports::QuoteSource;
use crate::domain::repositories::LedgerStore;
use crate::domain::types::{NewLedgerEntry, Quote, TradeReceipt, TradeSide, UserId};
use crate::domain::validation::{normalize_symbol, parse_share_count};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

pub struct TradeEngine {
    ledger: Arc<dyn LedgerStore>,
    quotes: Arc<dyn QuoteSource>,
    locks: Arc<UserLocks>,
}

impl TradeEngine {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        quotes: Arc<dyn QuoteSource>,
        locks: Arc<UserLocks>,
    ) -> Self {
        Self {
            ledger,
            quotes,
            locks,
        }
    }

    /// Buy `shares` (raw form field) of `symbol` at the current quoted price.
    pub async fn buy(
        &self,
        user_id: UserId,
        symbol: &str,
        shares: &str,
    ) -> Result<TradeReceipt, TradeError> {
        let shares = parse_share_count(shares)?;
        let symbol = normalize_symbol(symbol)?;

        let lock = self.locks.for_user(user_id);
        let _guard = lock.lock().await;

        let quote = self.checked_lookup(&symbol).await?;
        let total = quote.price * Decimal::from(shares);

        let cash = self.ledger.cash(user_id).await?;
        if cash < total {
            warn!(
                user_id,
                %symbol,
                "buy rejected: need {}, available {}",
                total,
                cash
            );
            return Err(TradeError::InsufficientFunds {
                need: total,
                available: cash,
            });
        }

        let cash_after = cash - total;
        let entry = NewLedgerEntry::from_trade(
            user_id,
            &quote,
            TradeSide::Buy,
            shares,
            chrono::Utc::now().timestamp(),
        );
        let entry_id = self.ledger.commit_trade(user_id, cash_after, entry).await?;

        info!(
            user_id,
            %symbol,
            shares,
            price = %quote.price,
            "buy committed (entry {})",
            entry_id
        );

        Ok(TradeReceipt {
            entry_id,
            side: TradeSide::Buy,
            symbol,
            name: quote.name,
            shares,
            price: quote.price,
            amount: total,
            cash_after,
        })
    }

    /// Sell `shares` (raw form field) of `symbol` at the current quoted price.
    pub async fn sell(
        &self,
        user_id: UserId,
        symbol: &str,
        shares: &str,
    ) -> Result<TradeReceipt, TradeError> {
        let shares = parse_share_count(shares)?;
        let symbol = normalize_symbol(symbol)?;

        let lock = self.locks.for_user(user_id);
        let _guard = lock.lock().await;

        let entries = self.ledger.entries_for(user_id).await?;
        let held = holding_for(&entries, &symbol);
        if held <= 0 {
            return Err(TradeError::NoPosition { symbol });
        }
        if shares > held {
            warn!(
                user_id,
                %symbol,
                "sell rejected: requested {}, held {}",
                shares,
                held
            );
            return Err(TradeError::InsufficientShares {
                symbol,
                requested: shares,
                held,
            });
        }

        let quote = self.checked_lookup(&symbol).await?;
        let proceeds = quote.price * Decimal::from(shares);

        let cash = self.ledger.cash(user_id).await?;
        let cash_after = cash + proceeds;
        let entry = NewLedgerEntry::from_trade(
            user_id,
            &quote,
            TradeSide::Sell,
            shares,
            chrono::Utc::now().timestamp(),
        );
        let entry_id = self.ledger.commit_trade(user_id, cash_after, entry).await?;

        info!(
            user_id,
            %symbol,
            shares,
            price = %quote.price,
            "sell committed (entry {})",
            entry_id
        );

        Ok(TradeReceipt {
            entry_id,
            side: TradeSide::Sell,
            symbol,
            name: quote.name,
            shares,
            price: quote.price,
            amount: proceeds,
            cash_after,
        })
    }

    /// Quote lookup that enforces price > 0, so no entry can ever be appended
    /// with a non-positive price.
    async fn checked_lookup(&self, symbol: &str) -> Result<Quote, TradeError> {
        let quote = self
            .quotes
            .lookup(symbol)
            .await?
            .ok_or_else(|| TradeError::UnknownSymbol {
                symbol: symbol.to_string(),
            })?;

        if quote.price <= Decimal::ZERO {
            return Err(TradeError::QuoteUnavailable(QuoteError::Malformed {
                symbol: symbol.to_string(),
                reason: format!("non-positive price {}", quote.price),
            }));
        }
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::RejectionKind;
    use crate::domain::repositories::UserRepository;
    use crate::infrastructure::in_memory::{InMemoryLedgerStore, InMemoryUserRepository};
    use crate::infrastructure::mock::MockQuoteSource;
    use rust_decimal_macros::dec;

    async fn engine_with_user(
        cash: Decimal,
    ) -> (TradeEngine, Arc<InMemoryLedgerStore>, Arc<MockQuoteSource>, UserId) {
        let users = Arc::new(InMemoryUserRepository::new());
        let user = users
            .create("alice", "digest", cash)
            .await
            .unwrap()
            .unwrap();
        let ledger = Arc::new(InMemoryLedgerStore::new(users.clone()));
        let quotes = Arc::new(MockQuoteSource::new());
        quotes.set_price("ABC", dec!(50.00)).await;

        let engine = TradeEngine::new(ledger.clone(), quotes.clone(), Arc::new(UserLocks::new()));
        (engine, ledger, quotes, user.id)
    }

    #[tokio::test]
    async fn buy_debits_cash_and_appends_entry() {
        let (engine, ledger, _quotes, user) = engine_with_user(dec!(10000.00)).await;

        let receipt = engine.buy(user, "ABC", "10").await.unwrap();
        assert_eq!(receipt.amount, dec!(500.00));
        assert_eq!(receipt.cash_after, dec!(9500.00));

        assert_eq!(ledger.cash(user).await.unwrap(), dec!(9500.00));
        let entries = ledger.entries_for(user).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].quantity, 10);
        assert_eq!(entries[0].total, dec!(500.00));
    }

    #[tokio::test]
    async fn buy_rejects_insufficient_funds_without_commit() {
        let (engine, ledger, _quotes, user) = engine_with_user(dec!(100.00)).await;

        let err = engine.buy(user, "ABC", "10").await.unwrap_err();
        assert!(matches!(err, TradeError::InsufficientFunds { .. }));
        assert_eq!(ledger.cash(user).await.unwrap(), dec!(100.00));
        assert!(ledger.entries_for(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fractional_quantity_is_a_validation_rejection() {
        let (engine, ledger, _quotes, user) = engine_with_user(dec!(10000.00)).await;

        let err = engine.buy(user, "ABC", "3.5").await.unwrap_err();
        assert_eq!(err.kind(), RejectionKind::Validation);
        assert!(ledger.entries_for(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_symbol_rejected() {
        let (engine, _ledger, _quotes, user) = engine_with_user(dec!(10000.00)).await;

        let err = engine.buy(user, "NOPE", "1").await.unwrap_err();
        assert!(matches!(err, TradeError::UnknownSymbol { symbol } if symbol == "NOPE"));
    }

    #[tokio::test]
    async fn sell_without_position_rejected() {
        let (engine, _ledger, _quotes, user) = engine_with_user(dec!(10000.00)).await;

        let err = engine.sell(user, "ABC", "1").await.unwrap_err();
        assert!(matches!(err, TradeError::NoPosition { .. }));
    }

    #[tokio::test]
    async fn oversell_rejected_and_balance_untouched() {
        let (engine, ledger, _quotes, user) = engine_with_user(dec!(10000.00)).await;
        engine.buy(user, "ABC", "10").await.unwrap();

        let err = engine.sell(user, "ABC", "15").await.unwrap_err();
        assert!(matches!(
            err,
            TradeError::InsufficientShares {
                requested: 15,
                held: 10,
                ..
            }
        ));
        assert_eq!(ledger.cash(user).await.unwrap(), dec!(9500.00));
    }

    #[tokio::test]
    async fn sell_at_higher_price_credits_proceeds() {
        let (engine, ledger, quotes, user) = engine_with_user(dec!(10000.00)).await;
        engine.buy(user, "ABC", "10").await.unwrap();

        quotes.set_price("ABC", dec!(60.00)).await;
        let receipt = engine.sell(user, "ABC", "10").await.unwrap();
        assert_eq!(receipt.amount, dec!(600.00));
        assert_eq!(ledger.cash(user).await.unwrap(), dec!(10100.00));

        let entries = ledger.entries_for(user).await.unwrap();
        assert_eq!(entries[1].quantity, -10);
        assert_eq!(entries[1].total, dec!(-600.00));
    }

    #[tokio::test]
    async fn buy_sell_round_trip_restores_cash_exactly() {
        let (engine, ledger, _quotes, user) = engine_with_user(dec!(10000.00)).await;

        engine.buy(user, "ABC", "7").await.unwrap();
        engine.sell(user, "ABC", "7").await.unwrap();

        assert_eq!(ledger.cash(user).await.unwrap(), dec!(10000.00));
        let entries = ledger.entries_for(user).await.unwrap();
        assert_eq!(holding_for(&entries, "ABC"), 0);
    }

    #[tokio::test]
    async fn quote_outage_is_retryable_and_commits_nothing() {
        let (engine, ledger, quotes, user) = engine_with_user(dec!(10000.00)).await;
        quotes.fail_next().await;

        let err = engine.buy(user, "ABC", "1").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(ledger.cash(user).await.unwrap(), dec!(10000.00));
        assert!(ledger.entries_for(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn symbol_is_case_insensitive() {
        let (engine, _ledger, _quotes, user) = engine_with_user(dec!(10000.00)).await;

        let receipt = engine.buy(user, "abc", "1").await.unwrap();
        assert_eq!(receipt.symbol, "ABC");
    }
}
