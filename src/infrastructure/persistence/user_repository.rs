use crate::domain::repositories::UserRepository;
use crate::domain::types::{User, UserId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let cash: String = row.try_get("cash")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        cash: Decimal::from_str(&cash).context("Failed to parse cash balance")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(
        &self,
        username: &str,
        password_hash: &str,
        starting_cash: Decimal,
    ) -> Result<Option<User>> {
        let created_at = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, cash, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(starting_cash.to_string())
        .bind(created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(Some(User {
                id: done.last_insert_rowid(),
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                cash: starting_cash,
                created_at,
            })),
            // Unique index on username backs the duplicate check
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(None),
            Err(err) => Err(err).context("Failed to insert user"),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query user by username")?;

        row.as_ref().map(map_user).transpose()
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query user by id")?;

        row.as_ref().map(map_user).transpose()
    }

    async fn update_password_hash(&self, user_id: UserId, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to update password hash")?;
        Ok(())
    }
}
