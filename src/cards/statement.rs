use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::MonthKey;
use crate::decimal::Money;
use crate::types::CardId;

/// amount a card issuer actually billed for one payment date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualStatement {
    pub card_id: CardId,
    pub payment_date: NaiveDate,
    pub amount: Money,
    #[serde(default)]
    pub memo: String,
}

impl ActualStatement {
    /// true when the statement was paid for `card_id` in `month`
    pub fn is_due_in(&self, card_id: CardId, month: MonthKey) -> bool {
        self.card_id == card_id && month.contains(self.payment_date)
    }

    /// days between the statement and an expected payment date
    pub fn days_from(&self, payment_date: NaiveDate) -> i64 {
        payment_date
            .signed_duration_since(self.payment_date)
            .num_days()
            .abs()
    }
}
