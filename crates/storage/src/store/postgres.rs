//! PostgreSQL ledger store implementation
//!
//! Rewards and ledger legs live in two tables (`rewards`, `ledger`). Every
//! settlement runs inside one database transaction; an uncommitted
//! `sqlx::Transaction` is rolled back when dropped.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, instrument};

use common::types::{
    AccountType, Holding, LedgerEntry, LedgerLeg, NewReward, Reward, RewardId, TimeWindow, UserId,
};

use crate::error::{Result, StorageError};
use crate::store::traits::{LedgerStore, LedgerTransaction};

/// PostgreSQL-backed ledger store
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    /// Connect a new pool to `database_url`
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to connect to database: {}", e)))?;

        info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create from an existing connection pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the migration SQL to create tables
    pub async fn run_migrations(&self) -> Result<()> {
        let migration_sql = include_str!("../../../../migrations/001_create_rewards.sql");
        sqlx::raw_sql(migration_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;
        info!("Database migrations completed successfully");
        Ok(())
    }
}

fn row_to_reward(row: &PgRow) -> Result<Reward> {
    Ok(Reward {
        reward_id: row.try_get("id").map_err(query_err)?,
        user_id: row.try_get("user_id").map_err(query_err)?,
        stock_symbol: row.try_get("stock_symbol").map_err(query_err)?,
        quantity: row.try_get("quantity").map_err(query_err)?,
        rewarded_at: row.try_get("rewarded_at").map_err(query_err)?,
    })
}

fn row_to_entry(row: &PgRow) -> Result<LedgerEntry> {
    let account_type: String = row.try_get("account_type").map_err(query_err)?;
    Ok(LedgerEntry {
        entry_id: row.try_get("id").map_err(query_err)?,
        reward_id: row.try_get("reward_id").map_err(query_err)?,
        account_type: AccountType::from_str(&account_type)
            .map_err(|e| StorageError::Query(e.to_string()))?,
        description: row.try_get("description").map_err(query_err)?,
        amount: row.try_get("amount").map_err(query_err)?,
        unit: row.try_get("currency").map_err(query_err)?,
    })
}

fn query_err(e: sqlx::Error) -> StorageError {
    StorageError::Query(e.to_string())
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Transaction(format!("Failed to begin: {}", e)))?;
        Ok(Box::new(PostgresTransaction { tx: Some(tx) }))
    }

    #[instrument(skip(self))]
    async fn holdings(&self, user_id: UserId, window: Option<TimeWindow>) -> Result<Vec<Holding>> {
        let start: Option<DateTime<Utc>> = window.map(|w| w.start);
        let end: Option<DateTime<Utc>> = window.map(|w| w.end);

        let rows = sqlx::query(
            r#"
            SELECT stock_symbol, SUM(quantity) AS quantity
            FROM rewards
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR rewarded_at >= $2)
              AND ($3::timestamptz IS NULL OR rewarded_at < $3)
            GROUP BY stock_symbol
            ORDER BY stock_symbol
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(query_err)?;

        rows.iter()
            .map(|row| {
                let quantity: BigDecimal = row.try_get("quantity").map_err(query_err)?;
                Ok(Holding {
                    stock_symbol: row.try_get("stock_symbol").map_err(query_err)?,
                    quantity,
                })
            })
            .collect()
    }

    async fn get_reward(&self, reward_id: RewardId) -> Result<Option<Reward>> {
        let row = sqlx::query(
            "SELECT id, user_id, stock_symbol, quantity, rewarded_at FROM rewards WHERE id = $1",
        )
        .bind(reward_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_err)?;

        row.as_ref().map(row_to_reward).transpose()
    }

    async fn entries_for_reward(&self, reward_id: RewardId) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, reward_id, account_type, description, amount, currency
            FROM ledger
            WHERE reward_id = $1
            ORDER BY id
            "#,
        )
        .bind(reward_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_err)?;

        rows.iter().map(row_to_entry).collect()
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

struct PostgresTransaction {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
}

impl PostgresTransaction {
    fn open(&mut self) -> Result<&mut sqlx::Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| StorageError::Transaction("transaction already finished".to_string()))
    }
}

#[async_trait]
impl LedgerTransaction for PostgresTransaction {
    async fn insert_reward(&mut self, reward: &NewReward) -> Result<Reward> {
        let tx = self.open()?;
        let row = sqlx::query(
            r#"
            INSERT INTO rewards (user_id, stock_symbol, quantity, rewarded_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, stock_symbol, quantity, rewarded_at
            "#,
        )
        .bind(reward.user_id)
        .bind(&reward.stock_symbol)
        .bind(&reward.quantity)
        .bind(reward.rewarded_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(query_err)?;

        let inserted = row_to_reward(&row)?;
        debug!(reward_id = inserted.reward_id, "Inserted reward");
        Ok(inserted)
    }

    async fn insert_entry(&mut self, reward_id: RewardId, leg: &LedgerLeg) -> Result<LedgerEntry> {
        let tx = self.open()?;
        let row = sqlx::query(
            r#"
            INSERT INTO ledger (reward_id, account_type, description, amount, currency)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, reward_id, account_type, description, amount, currency
            "#,
        )
        .bind(reward_id)
        .bind(leg.account_type.as_str())
        .bind(&leg.description)
        .bind(&leg.amount)
        .bind(&leg.unit)
        .fetch_one(&mut **tx)
        .await
        .map_err(query_err)?;

        row_to_entry(&row)
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| StorageError::Transaction("transaction already finished".to_string()))?;
        tx.commit()
            .await
            .map_err(|e| StorageError::Transaction(format!("Commit failed: {}", e)))
    }

    async fn rollback(&mut self) -> Result<()> {
        match self.tx.take() {
            Some(tx) => tx
                .rollback()
                .await
                .map_err(|e| StorageError::Transaction(format!("Rollback failed: {}", e))),
            None => Ok(()),
        }
    }
}
