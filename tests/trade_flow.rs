//! End-to-end trade flows against the SQLite stores.

use paperbroker::application::account_engine::AccountEngine;
use paperbroker::application::portfolio_service::PortfolioService;
use paperbroker::application::trade_engine::TradeEngine;
use paperbroker::application::user_locks::UserLocks;
use paperbroker::domain::errors::TradeError;
use paperbroker::domain::portfolio::holding_for;
use paperbroker::domain::repositories::LedgerStore;
use paperbroker::domain::types::{NewLedgerEntry, UserId};
use paperbroker::infrastructure::mock::{MockQuoteSource, PlainCredentialHasher};
use paperbroker::infrastructure::persistence::{Database, SqliteLedgerStore, SqliteUserRepository};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    trades: Arc<TradeEngine>,
    views: PortfolioService,
    ledger: Arc<SqliteLedgerStore>,
    quotes: Arc<MockQuoteSource>,
    user: UserId,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("trades.db").display());
    let db = Database::new(&url).await.expect("database");

    let users = Arc::new(SqliteUserRepository::new(db.pool.clone()));
    let ledger = Arc::new(SqliteLedgerStore::new(db.pool.clone()));
    let quotes = Arc::new(MockQuoteSource::new());
    quotes.set_price("ABC", dec!(50.00)).await;
    let locks = Arc::new(UserLocks::new());

    let accounts = AccountEngine::new(
        users,
        ledger.clone(),
        Arc::new(PlainCredentialHasher),
        locks.clone(),
        dec!(10000.00),
    );
    let user = accounts
        .register("trader", "pw", "pw")
        .await
        .expect("register")
        .id;

    Harness {
        _dir: dir,
        trades: Arc::new(TradeEngine::new(ledger.clone(), quotes.clone(), locks)),
        views: PortfolioService::new(ledger.clone(), quotes.clone()),
        ledger,
        quotes,
        user,
    }
}

#[tokio::test]
async fn buy_then_oversell_then_close_position() {
    let h = harness().await;

    // Buy 10 ABC at 50.00
    let receipt = h.trades.buy(h.user, "ABC", "10").await.unwrap();
    assert_eq!(receipt.cash_after, dec!(9500.00));
    let portfolio = h.views.get_portfolio(h.user).await.unwrap();
    assert_eq!(portfolio.position("ABC").unwrap().shares, 10);

    // Selling 15 must be rejected and leave cash untouched
    let err = h.trades.sell(h.user, "ABC", "15").await.unwrap_err();
    assert!(matches!(err, TradeError::InsufficientShares { .. }));
    assert_eq!(h.ledger.cash(h.user).await.unwrap(), dec!(9500.00));

    // Sell all 10 at 60.00: cash 9500 + 600, position gone
    h.quotes.set_price("ABC", dec!(60.00)).await;
    h.trades.sell(h.user, "ABC", "10").await.unwrap();
    assert_eq!(h.ledger.cash(h.user).await.unwrap(), dec!(10100.00));
    let portfolio = h.views.get_portfolio(h.user).await.unwrap();
    assert!(portfolio.position("ABC").is_none());
}

#[tokio::test]
async fn fractional_share_count_creates_no_entry() {
    let h = harness().await;

    let err = h.trades.buy(h.user, "ABC", "3.5").await.unwrap_err();
    assert!(matches!(err, TradeError::InvalidQuantity { .. }));
    assert!(h.ledger.entries_for(h.user).await.unwrap().is_empty());
    assert_eq!(h.ledger.cash(h.user).await.unwrap(), dec!(10000.00));
}

#[tokio::test]
async fn round_trip_at_same_price_has_no_drift() {
    let h = harness().await;

    h.trades.buy(h.user, "ABC", "13").await.unwrap();
    h.trades.sell(h.user, "ABC", "13").await.unwrap();

    assert_eq!(h.ledger.cash(h.user).await.unwrap(), dec!(10000.00));
    let portfolio = h.views.get_portfolio(h.user).await.unwrap();
    assert!(portfolio.position("ABC").is_none());
    assert_eq!(portfolio.total, dec!(10000.00));
}

#[tokio::test]
async fn history_reflects_both_legs() {
    let h = harness().await;
    h.trades.buy(h.user, "ABC", "2").await.unwrap();
    h.trades.sell(h.user, "ABC", "1").await.unwrap();

    let history = h.views.get_history(h.user).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].quantity, 2);
    assert_eq!(history[1].quantity, -1);
    assert_eq!(history[1].total, dec!(-50.00));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sells_cannot_both_drain_the_position() {
    let h = harness().await;
    h.trades.buy(h.user, "ABC", "10").await.unwrap();

    let (a, b) = tokio::join!(
        {
            let trades = h.trades.clone();
            let user = h.user;
            tokio::spawn(async move { trades.sell(user, "ABC", "6").await })
        },
        {
            let trades = h.trades.clone();
            let user = h.user;
            tokio::spawn(async move { trades.sell(user, "ABC", "6").await })
        }
    );
    let results = [a.unwrap(), b.unwrap()];

    let committed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(committed, 1, "exactly one concurrent sell may commit");
    assert!(results.iter().any(|r| matches!(
        r,
        Err(TradeError::InsufficientShares { requested: 6, held: 4, .. })
    )));

    let entries = h.ledger.entries_for(h.user).await.unwrap();
    assert_eq!(holding_for(&entries, "ABC"), 4);
}

#[tokio::test]
async fn failed_commit_rolls_back_without_partial_state() {
    let h = harness().await;
    h.trades.buy(h.user, "ABC", "2").await.unwrap();

    // An id with no users row makes the cash UPDATE touch nothing, so the
    // transaction must roll back and the entry insert must never land.
    let ghost = h.user + 99;
    let result = h
        .ledger
        .commit_trade(
            ghost,
            dec!(1.00),
            NewLedgerEntry {
                user_id: ghost,
                symbol: "ABC".into(),
                name: "ABC Inc.".into(),
                price: dec!(50.00),
                quantity: 1,
                total: dec!(50.00),
                timestamp: 1,
            },
        )
        .await;

    assert!(result.is_err());
    assert!(h.ledger.entries_for(ghost).await.unwrap().is_empty());
    assert_eq!(h.ledger.cash(h.user).await.unwrap(), dec!(9900.00));
    assert_eq!(h.ledger.entries_for(h.user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn random_valid_sequences_never_break_the_invariants() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let h = harness().await;
    let symbols = ["ABC", "DEF", "GHI"];
    h.quotes.set_price("DEF", dec!(12.30)).await;
    h.quotes.set_price("GHI", dec!(401.75)).await;

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let symbol = symbols[rng.random_range(0..symbols.len())];
        let shares = rng.random_range(1..=25).to_string();

        let result = if rng.random_bool(0.5) {
            h.trades.buy(h.user, symbol, &shares).await
        } else {
            h.trades.sell(h.user, symbol, &shares).await
        };

        match result {
            Ok(_) | Err(TradeError::InsufficientFunds { .. })
            | Err(TradeError::InsufficientShares { .. })
            | Err(TradeError::NoPosition { .. }) => {}
            Err(other) => panic!("unexpected rejection: {}", other),
        }

        let cash = h.ledger.cash(h.user).await.unwrap();
        assert!(cash >= Decimal::ZERO, "cash went negative: {}", cash);
    }

    let entries = h.ledger.entries_for(h.user).await.unwrap();
    for symbol in symbols {
        assert!(
            holding_for(&entries, symbol) >= 0,
            "short position in {}",
            symbol
        );
    }

    // Ledger/balance consistency: starting cash plus the fold of all entry
    // totals must equal the stored balance (reloads never ran here).
    let net: Decimal = entries.iter().map(|e| e.total).sum();
    let cash = h.ledger.cash(h.user).await.unwrap();
    assert_eq!(cash, dec!(10000.00) - net);
}
