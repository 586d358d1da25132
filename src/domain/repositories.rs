//! Repository abstractions for the ledger and user stores.
//!
//! Trait seams keep the engines storage-agnostic: the SQLite implementations
//! live in `infrastructure::persistence`, in-memory doubles in
//! `infrastructure::in_memory`. All methods surface storage failures as
//! `anyhow::Error` (fatal, untranslated).

use crate::domain::types::{EntryId, LedgerEntry, NewLedgerEntry, User, UserId};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Durable append-only transaction log plus the per-user cash balance.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// All entries for a user, ascending by timestamp (ties broken by entry
    /// id so the order is total). Reads only committed state.
    async fn entries_for(&self, user_id: UserId) -> Result<Vec<LedgerEntry>>;

    /// Current cash balance.
    async fn cash(&self, user_id: UserId) -> Result<Decimal>;

    /// The atomic unit: set the balance to `new_cash` and append `entry` so
    /// that both become visible or neither does. Trade-engine consistency
    /// (no orphaned balance changes, no orphaned entries) rests entirely on
    /// this contract.
    async fn commit_trade(
        &self,
        user_id: UserId,
        new_cash: Decimal,
        entry: NewLedgerEntry,
    ) -> Result<EntryId>;

    /// Atomically add `amount` to the balance and return the new value.
    /// Off-ledger: cash reloads deliberately leave no ledger entry.
    async fn credit_cash(&self, user_id: UserId, amount: Decimal) -> Result<Decimal>;
}

/// User identity storage.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Returns `Ok(None)` when the username is taken.
    async fn create(
        &self,
        username: &str,
        password_hash: &str,
        starting_cash: Decimal,
    ) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>>;

    async fn update_password_hash(&self, user_id: UserId, password_hash: &str) -> Result<()>;
}
