use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::domain::{CreditAccount, Transaction};

use super::{CreditStore, MIGRATION_001_USER_CREDITS};

/// SQLite-backed credit store. One row per user id.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_USER_CREDITS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<(String, CreditAccount)> {
        let user_id: String = row.get("user_id");
        let transactions_json: String = row.get("transactions");
        let last_updated_str: Option<String> = row.get("last_updated");

        let transactions: Vec<Transaction> = serde_json::from_str(&transactions_json)
            .with_context(|| format!("Invalid transaction log for user {}", user_id))?;

        let account = CreditAccount {
            credits: row.get("credits"),
            transactions,
            last_updated: last_updated_str
                .map(|s| DateTime::parse_from_rfc3339(&s))
                .transpose()
                .context("Invalid last_updated timestamp")?
                .map(|dt| dt.with_timezone(&Utc)),
        };
        Ok((user_id, account))
    }
}

#[async_trait]
impl CreditStore for Repository {
    async fn fetch(&self, user_id: &str) -> Result<Option<CreditAccount>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, credits, transactions, last_updated
            FROM user_credits
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch credit account")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?.1)),
            None => Ok(None),
        }
    }

    async fn put(&self, user_id: &str, account: &CreditAccount) -> Result<()> {
        let transactions_json = serde_json::to_string(&account.transactions)?;

        sqlx::query(
            r#"
            INSERT INTO user_credits (user_id, credits, transactions, last_updated)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                credits = excluded.credits,
                transactions = excluded.transactions,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(user_id)
        .bind(account.credits)
        .bind(&transactions_json)
        .bind(account.last_updated.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .context("Failed to save credit account")?;
        Ok(())
    }

    async fn insert_if_absent(
        &self,
        user_id: &str,
        account: &CreditAccount,
    ) -> Result<CreditAccount> {
        let transactions_json = serde_json::to_string(&account.transactions)?;

        sqlx::query(
            r#"
            INSERT INTO user_credits (user_id, credits, transactions, last_updated)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(account.credits)
        .bind(&transactions_json)
        .bind(account.last_updated.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .context("Failed to create credit account")?;

        self.fetch(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Credit account vanished after insert: {}", user_id))
    }

    async fn list(&self) -> Result<Vec<(String, CreditAccount)>> {
        let rows = sqlx::query(
            "SELECT user_id, credits, transactions, last_updated FROM user_credits ORDER BY user_id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list credit accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }
}
