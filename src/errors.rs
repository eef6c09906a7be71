use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::{Money, Rate};
use crate::types::CardId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("no applicable billing rule for card {card_id} on {date}")]
    NoApplicableRule {
        card_id: CardId,
        date: NaiveDate,
    },

    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("invalid term: {term}")]
    InvalidTerm {
        term: u32,
    },

    #[error("invalid interest rate: {rate}")]
    InvalidInterestRate {
        rate: Rate,
    },

    #[error("invalid day of month: {day}")]
    InvalidDayOfMonth {
        day: u32,
    },

    #[error("overlapping billing rules for card {card_id}: two rules effective from {effective_from}")]
    OverlappingRules {
        card_id: CardId,
        effective_from: NaiveDate,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
