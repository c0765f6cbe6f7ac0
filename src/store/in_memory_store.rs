use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::wallet::{Transaction, Wallet, WalletId};

use super::{StoreError, StoreResult, StoreTransaction, WalletStore};

#[derive(Debug, Default)]
struct Ledger {
    wallets: HashMap<WalletId, Decimal>,
    transactions: Vec<Transaction>,
}

/// Process-local store. Units of work are serialized by a single writer
/// lock, which is stricter than per-row locking but has the same outcome.
#[derive(Clone, Default)]
pub struct InMemoryWalletStore {
    ledger: Arc<RwLock<Ledger>>,
    writer: Arc<Mutex<()>>,
    #[cfg(test)]
    fail_appends: Arc<std::sync::atomic::AtomicBool>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all balances, committed state only.
    #[cfg(test)]
    pub(crate) async fn total_balance(&self) -> Decimal {
        self.ledger.read().await.wallets.values().copied().sum()
    }

    #[cfg(test)]
    pub(crate) fn fail_appends(&self, fail: bool) {
        self.fail_appends
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn create_wallet(&self) -> StoreResult<Wallet> {
        let wallet = Wallet::new(Uuid::new_v4());
        self.ledger
            .write()
            .await
            .wallets
            .insert(wallet.id, wallet.balance);
        Ok(wallet)
    }

    async fn get_wallet(&self, id: WalletId) -> StoreResult<Wallet> {
        let ledger = self.ledger.read().await;
        ledger
            .wallets
            .get(&id)
            .map(|balance| Wallet {
                id,
                balance: *balance,
            })
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_transactions(&self, wallet_id: WalletId) -> StoreResult<Vec<Transaction>> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .transactions
            .iter()
            .filter(|tx| tx.involves(wallet_id))
            .cloned()
            .collect())
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let writer = self.writer.clone().lock_owned().await;
        Ok(Box::new(InMemoryStoreTransaction {
            ledger: self.ledger.clone(),
            _writer: writer,
            staged_balances: HashMap::new(),
            staged_transactions: Vec::new(),
            #[cfg(test)]
            fail_appends: self
                .fail_appends
                .load(std::sync::atomic::Ordering::SeqCst),
        }))
    }

    fn backend_label(&self) -> &'static str {
        "memory"
    }
}

pub struct InMemoryStoreTransaction {
    ledger: Arc<RwLock<Ledger>>,
    _writer: OwnedMutexGuard<()>,
    staged_balances: HashMap<WalletId, Decimal>,
    staged_transactions: Vec<Transaction>,
    #[cfg(test)]
    fail_appends: bool,
}

impl InMemoryStoreTransaction {
    async fn current_balance(&self, id: WalletId) -> Option<Decimal> {
        if let Some(balance) = self.staged_balances.get(&id) {
            return Some(*balance);
        }
        self.ledger.read().await.wallets.get(&id).copied()
    }

    #[cfg(test)]
    fn check_injected_failure(&self) -> StoreResult<()> {
        if self.fail_appends {
            return Err(StoreError::Query {
                operation: "append_transaction",
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn check_injected_failure(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for InMemoryStoreTransaction {
    async fn lock_wallet(&mut self, id: WalletId) -> StoreResult<Option<Wallet>> {
        // the writer guard already excludes every other unit of work
        Ok(self
            .current_balance(id)
            .await
            .map(|balance| Wallet { id, balance }))
    }

    async fn update_balance(&mut self, id: WalletId, new_balance: Decimal) -> StoreResult<()> {
        if self.current_balance(id).await.is_none() {
            return Err(StoreError::NotFound(id));
        }
        self.staged_balances.insert(id, new_balance);
        Ok(())
    }

    async fn append_transaction(&mut self, entry: &Transaction) -> StoreResult<()> {
        self.check_injected_failure()?;
        self.staged_transactions.push(entry.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        let mut ledger = this.ledger.write().await;
        ledger.wallets.extend(this.staged_balances);
        ledger.transactions.extend(this.staged_transactions);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::wallet::INITIAL_BALANCE;

    use super::*;

    #[tokio::test]
    async fn create_and_get_wallet() {
        let store = InMemoryWalletStore::new();
        let created = store.create_wallet().await.unwrap();
        assert_eq!(created.balance, INITIAL_BALANCE);

        let fetched = store.get_wallet(created.id).await.unwrap();
        assert_eq!(fetched, created);

        let missing = Uuid::new_v4();
        let err = store.get_wallet(missing).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn staged_writes_are_invisible_until_commit() {
        let store = InMemoryWalletStore::new();
        let a = store.create_wallet().await.unwrap();
        let b = store.create_wallet().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.update_balance(a.id, Decimal::from(60)).await.unwrap();
        tx.update_balance(b.id, Decimal::from(140)).await.unwrap();
        tx.append_transaction(&Transaction::new(Utc::now(), a.id, b.id, Decimal::from(40)))
            .await
            .unwrap();

        // the staged balance is what the unit of work itself sees
        let locked = tx.lock_wallet(a.id).await.unwrap().unwrap();
        assert_eq!(locked.balance, Decimal::from(60));
        assert_eq!(store.get_wallet(a.id).await.unwrap().balance, INITIAL_BALANCE);
        assert!(store.list_transactions(a.id).await.unwrap().is_empty());

        tx.commit().await.unwrap();
        assert_eq!(store.get_wallet(a.id).await.unwrap().balance, Decimal::from(60));
        assert_eq!(store.get_wallet(b.id).await.unwrap().balance, Decimal::from(140));
        assert_eq!(store.list_transactions(b.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = InMemoryWalletStore::new();
        let a = store.create_wallet().await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.update_balance(a.id, Decimal::ZERO).await.unwrap();
        }

        assert_eq!(store.get_wallet(a.id).await.unwrap().balance, INITIAL_BALANCE);
        // the writer lock was released with the dropped unit of work
        let tx = store.begin().await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn update_unknown_wallet_fails() {
        let store = InMemoryWalletStore::new();
        let mut tx = store.begin().await.unwrap();
        assert!(tx.lock_wallet(Uuid::new_v4()).await.unwrap().is_none());
        let err = tx
            .update_balance(Uuid::new_v4(), Decimal::ONE)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn history_keeps_insertion_order() {
        let store = InMemoryWalletStore::new();
        let a = store.create_wallet().await.unwrap();
        let b = store.create_wallet().await.unwrap();
        let c = store.create_wallet().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        for (from, to) in [(a.id, b.id), (c.id, b.id), (b.id, a.id)] {
            tx.append_transaction(&Transaction::new(Utc::now(), from, to, Decimal::ONE))
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();

        let history_a = store.list_transactions(a.id).await.unwrap();
        assert_eq!(history_a.len(), 2);
        assert_eq!(history_a[0].to, b.id);
        assert_eq!(history_a[1].from, b.id);
        assert_eq!(store.list_transactions(b.id).await.unwrap().len(), 3);
        assert!(store.list_transactions(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
