use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::wallet::{Transaction, Wallet, WalletId};

pub mod in_memory_store;
pub mod postgres_store;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Wallet {0} not found")]
    NotFound(WalletId),
    #[error("Database connection error: {0}")]
    Connection(String),
    #[error("{operation} failed: {message}")]
    Query {
        operation: &'static str,
        message: String,
    },
    #[error("Transaction error during {operation}: {message}")]
    Transaction {
        operation: &'static str,
        message: String,
    },
    #[error("Migration error: {0}")]
    Migration(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persisted wallets and the transfer ledger.
///
/// Reads on the store itself only ever observe committed state. Every write
/// that touches an existing wallet goes through a [`StoreTransaction`].
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Persists a fresh wallet holding [`crate::wallet::INITIAL_BALANCE`].
    async fn create_wallet(&self) -> StoreResult<Wallet>;

    /// Fails with [`StoreError::NotFound`] when no such wallet exists.
    async fn get_wallet(&self, id: WalletId) -> StoreResult<Wallet>;

    /// All entries where the wallet is source or destination, in insertion
    /// order. Does not check that the wallet exists.
    async fn list_transactions(&self, wallet_id: WalletId) -> StoreResult<Vec<Transaction>>;

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    fn backend_label(&self) -> &'static str;
}

/// Atomic unit of work.
///
/// Nothing staged through it is visible to other readers until [`commit`]
/// returns. Dropping it uncommitted discards everything, which is also what
/// happens when the owning request is cancelled.
///
/// [`commit`]: StoreTransaction::commit
#[async_trait]
pub trait StoreTransaction: Send {
    /// Reads a wallet and holds an exclusive lock on it until the unit of
    /// work ends. Callers locking several wallets must do so in ascending id
    /// order.
    async fn lock_wallet(&mut self, id: WalletId) -> StoreResult<Option<Wallet>>;

    async fn update_balance(&mut self, id: WalletId, new_balance: Decimal) -> StoreResult<()>;

    async fn append_transaction(&mut self, entry: &Transaction) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
