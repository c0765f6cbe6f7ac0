use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::{
    command::{TransferCommand, TransferCommandError},
    store::{StoreError, StoreTransaction, WalletStore},
    wallet::{Transaction, Wallet, WalletError, WalletId},
};

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Wallet {0} not found")]
    WalletNotFound(WalletId),
    #[error("Target wallet {0} not found")]
    TargetWalletNotFound(WalletId),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    Command(#[from] TransferCommandError),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Owns every balance mutation: the initial grant and transfers.
#[derive(Clone)]
pub struct TransferEngine {
    store: Arc<dyn WalletStore>,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn WalletStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn create_wallet(&self) -> Result<Wallet, StoreError> {
        let wallet = self.store.create_wallet().await?;
        info!(wallet_id = %wallet.id, "Wallet created");
        Ok(wallet)
    }

    /// Moves `command.amount` from one wallet to another.
    ///
    /// Both rows are locked before any rule is evaluated. The rules then run
    /// in a fixed order: source exists, source can afford it, target exists.
    /// Balances and the ledger entry are committed together or not at all.
    #[instrument(skip(self, command), fields(from = %command.from, to = %command.to, amount = %command.amount))]
    pub async fn transfer(&self, command: TransferCommand) -> Result<(), TransferError> {
        // dropping `tx` on any early return rolls the unit of work back
        let mut tx = self.store.begin().await?;
        let (source, target) = lock_wallets(&mut *tx, &command).await?;

        let mut source = source.ok_or(TransferError::WalletNotFound(command.from))?;
        let debit = source.handle_debit(command.amount)?;
        let mut target = target.ok_or(TransferError::TargetWalletNotFound(command.to))?;

        if command.is_self_transfer() {
            let credit = source.handle_credit(command.amount)?;
            source.apply(&debit);
            source.apply(&credit);
            tx.update_balance(source.id, source.balance).await?;
        } else {
            let credit = target.handle_credit(command.amount)?;
            source.apply(&debit);
            target.apply(&credit);
            tx.update_balance(source.id, source.balance).await?;
            tx.update_balance(target.id, target.balance).await?;
        }

        let entry = Transaction::new(Utc::now(), command.from, command.to, command.amount);
        tx.append_transaction(&entry).await?;
        tx.commit().await?;

        debug!(
            source_balance = %source.balance,
            "Transfer committed"
        );
        Ok(())
    }
}

/// Locks the wallets of a transfer in ascending id order, so that two
/// transfers over the same pair in opposite directions cannot deadlock.
async fn lock_wallets(
    tx: &mut dyn StoreTransaction,
    command: &TransferCommand,
) -> Result<(Option<Wallet>, Option<Wallet>), StoreError> {
    let mut source = None;
    let mut target = None;
    for id in command.lock_order() {
        let wallet = tx.lock_wallet(id).await?;
        if id == command.from {
            source = wallet.clone();
        }
        if id == command.to {
            target = wallet;
        }
    }
    Ok((source, target))
}
