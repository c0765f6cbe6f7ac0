use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use crate::{
    store::{StoreError, WalletStore},
    wallet::{Transaction, Wallet, WalletId},
};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Wallet {0} not found")]
    WalletNotFound(WalletId),
    #[error(transparent)]
    Storage(StoreError),
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::WalletNotFound(id),
            other => Self::Storage(other),
        }
    }
}

#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn WalletStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn WalletStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn wallet_status(&self, id: WalletId) -> Result<Wallet, QueryError> {
        Ok(self.store.get_wallet(id).await?)
    }

    /// An existing wallet without transfers yields an empty history, an
    /// unknown wallet yields [`QueryError::WalletNotFound`].
    #[instrument(skip(self))]
    pub async fn transaction_history(&self, id: WalletId) -> Result<Vec<Transaction>, QueryError> {
        self.store.get_wallet(id).await?;
        Ok(self.store.list_transactions(id).await?)
    }
}
