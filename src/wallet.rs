use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type WalletId = Uuid;

/// Balance granted to every wallet when it is created.
pub const INITIAL_BALANCE: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletEventKind {
    Debited,
    Credited,
}

#[derive(Debug, Clone, Copy)]
pub struct WalletEvent {
    amount: Decimal,
    kind: WalletEventKind,
}

impl WalletEvent {
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn kind(&self) -> WalletEventKind {
        self.kind
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("Insufficient balance")]
    InsufficientBalance,
    #[error("Balance overflow")]
    BalanceOverflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

impl Wallet {
    pub fn new(id: WalletId) -> Self {
        Self {
            id,
            balance: INITIAL_BALANCE,
        }
    }

    /// Events are validated by `handle_*` before they get here, so the
    /// arithmetic is trusted.
    pub fn apply(&mut self, event: &WalletEvent) {
        match event.kind {
            WalletEventKind::Debited => {
                self.balance -= event.amount;
            }
            WalletEventKind::Credited => {
                self.balance += event.amount;
            }
        }
    }

    pub fn handle_debit(&self, amount: Decimal) -> Result<WalletEvent, WalletError> {
        if self.balance - amount >= Decimal::ZERO {
            Ok(WalletEvent {
                amount,
                kind: WalletEventKind::Debited,
            })
        } else {
            Err(WalletError::InsufficientBalance)
        }
    }

    pub fn handle_credit(&self, amount: Decimal) -> Result<WalletEvent, WalletError> {
        match self.balance.checked_add(amount) {
            Some(_) => Ok(WalletEvent {
                amount,
                kind: WalletEventKind::Credited,
            }),
            None => Err(WalletError::BalanceOverflow),
        }
    }
}

/// Ledger entry for a completed transfer. Never modified once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub time: DateTime<Utc>,
    pub from: WalletId,
    pub to: WalletId,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

impl Transaction {
    pub fn new(time: DateTime<Utc>, from: WalletId, to: WalletId, amount: Decimal) -> Self {
        Self {
            time,
            from,
            to,
            amount,
        }
    }

    pub fn involves(&self, wallet_id: WalletId) -> bool {
        self.from == wallet_id || self.to == wallet_id
    }
}
