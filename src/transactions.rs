use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{EngineError, Result};
use crate::types::{CardId, TxId};

fn default_installment_count() -> u32 {
    1
}

/// installment fee terms of a card purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FeeMode {
    /// interest-free installments
    #[default]
    Free,
    /// fee charged monthly on the unpaid principal
    Manual { monthly_rate: Rate },
}

impl FeeMode {
    /// monthly fee rate, zero for fee-free purchases
    pub fn monthly_rate(&self) -> Rate {
        match self {
            FeeMode::Free => Rate::ZERO,
            FeeMode::Manual { monthly_rate } => *monthly_rate,
        }
    }
}

/// ledger transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,
    pub date: NaiveDate,
    /// card the charge was made with, `None` for cash and transfers
    #[serde(default)]
    pub card_id: Option<CardId>,
    /// signed amount; the sign is the ledger's direction, billing uses the magnitude
    pub amount: Money,
    #[serde(default = "default_installment_count")]
    pub installment_count: u32,
    #[serde(default)]
    pub fee_mode: FeeMode,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub memo: String,
}

impl Transaction {
    /// single-payment transaction without a card
    pub fn new(date: NaiveDate, amount: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            card_id: None,
            amount,
            installment_count: 1,
            fee_mode: FeeMode::Free,
            category: String::new(),
            memo: String::new(),
        }
    }

    pub fn on_card(mut self, card_id: CardId) -> Self {
        self.card_id = Some(card_id);
        self
    }

    pub fn installments(mut self, count: u32, fee_mode: FeeMode) -> Self {
        self.installment_count = count;
        self.fee_mode = fee_mode;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn is_installment(&self) -> bool {
        self.installment_count > 1
    }

    /// reject transactions that cannot be split into installments
    pub fn validate(&self) -> Result<()> {
        if self.installment_count == 0 {
            return Err(EngineError::InvalidTerm {
                term: self.installment_count,
            });
        }

        if self.amount.is_zero() {
            return Err(EngineError::InvalidAmount {
                amount: self.amount,
            });
        }

        if self.fee_mode.monthly_rate().is_negative() {
            return Err(EngineError::InvalidInterestRate {
                rate: self.fee_mode.monthly_rate(),
            });
        }

        Ok(())
    }
}
