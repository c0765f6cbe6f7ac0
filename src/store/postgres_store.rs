//! PostgreSQL wallet store.
//!
//! Transfers run inside one database transaction per request. Wallet rows are
//! locked with `SELECT ... FOR UPDATE`, so two transfers touching the same
//! wallet queue up behind each other instead of racing on the balance.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction as PgTransaction};
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::wallet::{Transaction, Wallet, WalletId};

use super::{StoreError, StoreResult, StoreTransaction, WalletStore};

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/ewallet".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct PgWalletStore {
    pool: PgPool,
}

impl PgWalletStore {
    #[instrument(skip_all)]
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        debug!(
            max_conn = config.max_connections,
            min_conn = config.min_connections,
            "Creating connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }

    #[instrument(skip(self))]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        debug!("Migrations completed");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn query_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    error!(operation, error = %err, "Wallet store query failed");
    StoreError::Query {
        operation,
        message: err.to_string(),
    }
}

fn transaction_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    error!(operation, error = %err, "Wallet store transaction failed");
    StoreError::Transaction {
        operation,
        message: err.to_string(),
    }
}

#[async_trait]
impl WalletStore for PgWalletStore {
    async fn create_wallet(&self) -> StoreResult<Wallet> {
        let wallet = Wallet::new(Uuid::new_v4());
        sqlx::query("INSERT INTO wallets (id, balance) VALUES ($1, $2)")
            .bind(wallet.id)
            .bind(wallet.balance)
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("create_wallet", e))?;
        Ok(wallet)
    }

    async fn get_wallet(&self, id: WalletId) -> StoreResult<Wallet> {
        let row = sqlx::query_as::<_, WalletRow>("SELECT id, balance FROM wallets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_error("get_wallet", e))?;

        row.map(WalletRow::into_wallet)
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_transactions(&self, wallet_id: WalletId) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT made_at, transfered_from, transfered_to, amount
            FROM transactions
            WHERE transfered_from = $1 OR transfered_to = $1
            ORDER BY id ASC
            "#,
        )
        .bind(wallet_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_error("list_transactions", e))?;

        Ok(rows.into_iter().map(TransactionRow::into_transaction).collect())
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| transaction_error("begin", e))?;
        Ok(Box::new(PgStoreTransaction { tx }))
    }

    fn backend_label(&self) -> &'static str {
        "postgres"
    }
}

/// Rolled back by sqlx when dropped without [`StoreTransaction::commit`].
pub struct PgStoreTransaction {
    tx: PgTransaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn lock_wallet(&mut self, id: WalletId) -> StoreResult<Option<Wallet>> {
        let row = sqlx::query_as::<_, WalletRow>(
            "SELECT id, balance FROM wallets WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| query_error("lock_wallet", e))?;

        Ok(row.map(WalletRow::into_wallet))
    }

    async fn update_balance(&mut self, id: WalletId, new_balance: Decimal) -> StoreResult<()> {
        let result = sqlx::query("UPDATE wallets SET balance = $2 WHERE id = $1")
            .bind(id)
            .bind(new_balance)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| query_error("update_balance", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn append_transaction(&mut self, entry: &Transaction) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (made_at, transfered_from, transfered_to, amount)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(entry.time)
        .bind(entry.from)
        .bind(entry.to)
        .bind(entry.amount)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| query_error("append_transaction", e))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| transaction_error("commit", e))
    }
}

#[derive(sqlx::FromRow)]
struct WalletRow {
    id: Uuid,
    balance: Decimal,
}

impl WalletRow {
    fn into_wallet(self) -> Wallet {
        Wallet {
            id: self.id,
            balance: self.balance,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    made_at: DateTime<Utc>,
    transfered_from: Uuid,
    transfered_to: Uuid,
    amount: Decimal,
}

impl TransactionRow {
    fn into_transaction(self) -> Transaction {
        Transaction::new(
            self.made_at,
            self.transfered_from,
            self.transfered_to,
            self.amount,
        )
    }
}
