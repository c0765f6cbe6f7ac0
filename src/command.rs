use rust_decimal::Decimal;
use thiserror::Error;

use crate::wallet::WalletId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransferCommandError {
    #[error("Amount is required for a transfer")]
    AmountRequired,
    #[error("Amount must be positive, got {amount}")]
    NonPositiveAmount { amount: Decimal },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCommand {
    pub from: WalletId,
    pub to: WalletId,
    pub amount: Decimal,
}

impl TransferCommand {
    /// Builds a command from raw request input.
    ///
    /// Wallet existence and balance are not checked here, that is up to the
    /// engine while it holds the row locks.
    pub fn new(
        from: WalletId,
        to: WalletId,
        amount: Option<Decimal>,
    ) -> Result<Self, TransferCommandError> {
        let Some(amount) = amount else {
            return Err(TransferCommandError::AmountRequired);
        };
        if amount <= Decimal::ZERO {
            return Err(TransferCommandError::NonPositiveAmount { amount });
        }
        Ok(Self {
            from,
            to,
            amount: amount.normalize(),
        })
    }

    pub fn is_self_transfer(&self) -> bool {
        self.from == self.to
    }

    /// Wallet ids in the order their rows must be locked.
    pub fn lock_order(&self) -> Vec<WalletId> {
        let mut ids = vec![self.from, self.to];
        ids.sort();
        ids.dedup();
        ids
    }
}
