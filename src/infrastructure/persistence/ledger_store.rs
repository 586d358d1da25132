use crate::domain::repositories::LedgerStore;
use crate::domain::types::{EntryId, LedgerEntry, NewLedgerEntry, UserId};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

/// SQLite-backed ledger. Money columns are stored as TEXT and parsed back
/// into `Decimal`, so no float drift can enter the books.
pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

impl SqliteLedgerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_entry(row: &sqlx::sqlite::SqliteRow) -> Result<LedgerEntry> {
    let price: String = row.try_get("price")?;
    let total: String = row.try_get("total")?;
    Ok(LedgerEntry {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        symbol: row.try_get("symbol")?,
        name: row.try_get("name")?,
        price: Decimal::from_str(&price).context("Failed to parse ledger price")?,
        quantity: row.try_get("quantity")?,
        total: Decimal::from_str(&total).context("Failed to parse ledger total")?,
        timestamp: row.try_get("timestamp")?,
    })
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn entries_for(&self, user_id: UserId) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, symbol, name, price, quantity, total, timestamp
            FROM ledger
            WHERE user_id = ?
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to read ledger entries")?;

        rows.iter().map(map_entry).collect()
    }

    async fn cash(&self, user_id: UserId) -> Result<Decimal> {
        let row = sqlx::query("SELECT cash FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read cash balance")?;

        let Some(row) = row else {
            bail!("unknown user id {}", user_id);
        };
        let cash: String = row.try_get("cash")?;
        Decimal::from_str(&cash).context("Failed to parse cash balance")
    }

    async fn commit_trade(
        &self,
        user_id: UserId,
        new_cash: Decimal,
        entry: NewLedgerEntry,
    ) -> Result<EntryId> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin trade transaction")?;

        let updated = sqlx::query("UPDATE users SET cash = ? WHERE id = ?")
            .bind(new_cash.to_string())
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to update cash balance")?;
        if updated.rows_affected() == 0 {
            bail!("unknown user id {}", user_id);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO ledger (user_id, symbol, name, price, quantity, total, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.user_id)
        .bind(&entry.symbol)
        .bind(&entry.name)
        .bind(entry.price.to_string())
        .bind(entry.quantity)
        .bind(entry.total.to_string())
        .bind(entry.timestamp)
        .execute(&mut *tx)
        .await
        .context("Failed to append ledger entry")?;

        tx.commit()
            .await
            .context("Failed to commit trade transaction")?;

        Ok(inserted.last_insert_rowid())
    }

    async fn credit_cash(&self, user_id: UserId, amount: Decimal) -> Result<Decimal> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin reload transaction")?;

        let row = sqlx::query("SELECT cash FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to read cash balance")?;
        let Some(row) = row else {
            bail!("unknown user id {}", user_id);
        };
        let cash: String = row.try_get("cash")?;
        let balance = Decimal::from_str(&cash).context("Failed to parse cash balance")? + amount;

        sqlx::query("UPDATE users SET cash = ? WHERE id = ?")
            .bind(balance.to_string())
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to update cash balance")?;

        tx.commit()
            .await
            .context("Failed to commit reload transaction")?;

        Ok(balance)
    }
}
