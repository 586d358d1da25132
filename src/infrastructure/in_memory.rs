//! In-memory store implementations, used by unit tests and available as a
//! zero-setup backend for the engines.

use crate::domain::repositories::{LedgerStore, UserRepository};
use crate::domain::types::{EntryId, LedgerEntry, NewLedgerEntry, User, UserId};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn cash_of(&self, user_id: UserId) -> Result<Decimal> {
        let users = self.users.read().await;
        users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.cash)
            .ok_or_else(|| anyhow!("unknown user id {}", user_id))
    }

    pub(crate) async fn set_cash(&self, user_id: UserId, cash: Decimal) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| anyhow!("unknown user id {}", user_id))?;
        user.cash = cash;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(
        &self,
        username: &str,
        password_hash: &str,
        starting_cash: Decimal,
    ) -> Result<Option<User>> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.username == username) {
            return Ok(None);
        }

        let user = User {
            id: users.len() as i64 + 1,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            cash: starting_cash,
            created_at: chrono::Utc::now().timestamp(),
        };
        users.push(user.clone());
        Ok(Some(user))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn update_password_hash(&self, user_id: UserId, password_hash: &str) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| anyhow!("unknown user id {}", user_id))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }
}

/// Ledger over the in-memory user rows. The entries lock is held across the
/// cash update inside `commit_trade`, so both writes land together.
pub struct InMemoryLedgerStore {
    users: Arc<InMemoryUserRepository>,
    entries: RwLock<Vec<LedgerEntry>>,
}

impl InMemoryLedgerStore {
    pub fn new(users: Arc<InMemoryUserRepository>) -> Self {
        Self {
            users,
            entries: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn entries_for(&self, user_id: UserId) -> Result<Vec<LedgerEntry>> {
        let entries = self.entries.read().await;
        let mut mine: Vec<LedgerEntry> = entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by_key(|e| (e.timestamp, e.id));
        Ok(mine)
    }

    async fn cash(&self, user_id: UserId) -> Result<Decimal> {
        self.users.cash_of(user_id).await
    }

    async fn commit_trade(
        &self,
        user_id: UserId,
        new_cash: Decimal,
        entry: NewLedgerEntry,
    ) -> Result<EntryId> {
        let mut entries = self.entries.write().await;
        self.users.set_cash(user_id, new_cash).await?;

        let id = entries.len() as i64 + 1;
        entries.push(LedgerEntry {
            id,
            user_id: entry.user_id,
            symbol: entry.symbol,
            name: entry.name,
            price: entry.price,
            quantity: entry.quantity,
            total: entry.total,
            timestamp: entry.timestamp,
        });
        Ok(id)
    }

    async fn credit_cash(&self, user_id: UserId, amount: Decimal) -> Result<Decimal> {
        let balance = self.users.cash_of(user_id).await? + amount;
        self.users.set_cash(user_id, balance).await?;
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn commit_trade_updates_cash_and_log_together() {
        let users = Arc::new(InMemoryUserRepository::new());
        let user = users
            .create("alice", "digest", dec!(1000))
            .await
            .unwrap()
            .unwrap();
        let ledger = InMemoryLedgerStore::new(users);

        let id = ledger
            .commit_trade(
                user.id,
                dec!(900),
                NewLedgerEntry {
                    user_id: user.id,
                    symbol: "ABC".into(),
                    name: "ABC Inc.".into(),
                    price: dec!(100),
                    quantity: 1,
                    total: dec!(100),
                    timestamp: 1,
                },
            )
            .await
            .unwrap();

        assert_eq!(id, 1);
        assert_eq!(ledger.cash(user.id).await.unwrap(), dec!(900));
        assert_eq!(ledger.entries_for(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn commit_trade_for_unknown_user_leaves_no_partial_state() {
        let users = Arc::new(InMemoryUserRepository::new());
        let alice = users
            .create("alice", "digest", dec!(1000))
            .await
            .unwrap()
            .unwrap();
        let ledger = InMemoryLedgerStore::new(users);

        let ghost = alice.id + 99;
        let result = ledger
            .commit_trade(
                ghost,
                dec!(900),
                NewLedgerEntry {
                    user_id: ghost,
                    symbol: "ABC".into(),
                    name: "ABC Inc.".into(),
                    price: dec!(100),
                    quantity: 1,
                    total: dec!(100),
                    timestamp: 1,
                },
            )
            .await;

        assert!(result.is_err());
        assert!(ledger.entries_for(ghost).await.unwrap().is_empty());
        assert_eq!(ledger.cash(alice.id).await.unwrap(), dec!(1000));
    }

    #[tokio::test]
    async fn entries_isolated_per_user() {
        let users = Arc::new(InMemoryUserRepository::new());
        let alice = users.create("alice", "d", dec!(0)).await.unwrap().unwrap();
        let bob = users.create("bob", "d", dec!(0)).await.unwrap().unwrap();
        let ledger = InMemoryLedgerStore::new(users);

        ledger
            .commit_trade(
                alice.id,
                dec!(0),
                NewLedgerEntry {
                    user_id: alice.id,
                    symbol: "ABC".into(),
                    name: "ABC Inc.".into(),
                    price: dec!(1),
                    quantity: 1,
                    total: dec!(1),
                    timestamp: 1,
                },
            )
            .await
            .unwrap();

        assert_eq!(ledger.entries_for(alice.id).await.unwrap().len(), 1);
        assert!(ledger.entries_for(bob.id).await.unwrap().is_empty());
    }
}
