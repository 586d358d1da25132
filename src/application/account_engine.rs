//! Registration, credential verification/rotation and cash top-up.
//!
//! Same discipline as the trade engine: any cash mutation happens under the
//! user's lock as one atomic storage operation.

use crate::application::user_locks::UserLocks;
use crate::domain::errors::AccountError;
use crate::domain::ports::CredentialHasher;
use crate::domain::repositories::{LedgerStore, UserRepository};
use crate::domain::types::{Principal, User, UserId};
use crate::domain::validation::{
    PasswordChangeForm, RegistrationForm, validate_password_change, validate_registration,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

pub struct AccountEngine {
    users: Arc<dyn UserRepository>,
    ledger: Arc<dyn LedgerStore>,
    hasher: Arc<dyn CredentialHasher>,
    locks: Arc<UserLocks>,
    starting_cash: Decimal,
}

impl AccountEngine {
    pub fn new(
        users: Arc<dyn UserRepository>,
        ledger: Arc<dyn LedgerStore>,
        hasher: Arc<dyn CredentialHasher>,
        locks: Arc<UserLocks>,
        starting_cash: Decimal,
    ) -> Self {
        Self {
            users,
            ledger,
            hasher,
            locks,
            starting_cash,
        }
    }

    /// Create a new account with seeded cash and a hashed credential.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<User, AccountError> {
        let form = RegistrationForm {
            username,
            password,
            confirmation,
        };
        validate_registration(&form)?;

        let username = username.trim();
        let digest = self.hasher.hash(password)?;

        match self
            .users
            .create(username, &digest, self.starting_cash)
            .await?
        {
            Some(user) => {
                info!(user_id = user.id, %username, "registered new account");
                Ok(user)
            }
            None => Err(AccountError::UsernameTaken {
                username: username.to_string(),
            }),
        }
    }

    /// Verify a credential and yield a session principal. Unknown username
    /// and wrong password are indistinguishable to the caller.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Principal, AccountError> {
        if username.trim().is_empty() {
            return Err(AccountError::MissingField { field: "username" });
        }
        if password.is_empty() {
            return Err(AccountError::MissingField { field: "password" });
        }

        let user = self
            .users
            .find_by_username(username.trim())
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !self.hasher.verify(password, &user.password_hash) {
            return Err(AccountError::InvalidCredentials);
        }

        Ok(Principal {
            user_id: user.id,
            username: user.username,
        })
    }

    /// Replace the stored credential hash. Rejection order: missing fields,
    /// current-password mismatch, unchanged password, confirmation mismatch.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
        confirmation: &str,
    ) -> Result<(), AccountError> {
        let form = PasswordChangeForm {
            current,
            new,
            confirmation,
        };
        validate_password_change(&form)?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !self.hasher.verify(current, &user.password_hash) {
            return Err(AccountError::InvalidCredentials);
        }
        if new == current {
            return Err(AccountError::PasswordUnchanged);
        }
        if new != confirmation {
            return Err(AccountError::ConfirmationMismatch);
        }

        let digest = self.hasher.hash(new)?;
        self.users.update_password_hash(user_id, &digest).await?;
        info!(user_id, "password changed");
        Ok(())
    }

    /// Add cash to the balance. Off-ledger: reloads leave no ledger entry,
    /// so holdings math is unaffected.
    pub async fn reload_cash(
        &self,
        user_id: UserId,
        amount: Decimal,
    ) -> Result<Decimal, AccountError> {
        if amount <= Decimal::ZERO {
            return Err(AccountError::InvalidAmount { amount });
        }

        let lock = self.locks.for_user(user_id);
        let _guard = lock.lock().await;

        let balance = self.ledger.credit_cash(user_id, amount).await?;
        info!(user_id, %amount, "cash reloaded, balance now {}", balance);
        Ok(balance)
    }
}
