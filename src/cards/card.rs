use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::CardId;

/// payment card kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    /// charges are collected per statement cycle
    Credit,
    /// charges settle immediately from the linked account
    Debit,
}

/// payment card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    pub kind: CardKind,
    pub active: bool,
}

impl Card {
    pub fn new(name: impl Into<String>, kind: CardKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            active: true,
        }
    }

    pub fn credit(name: impl Into<String>) -> Self {
        Self::new(name, CardKind::Credit)
    }

    pub fn debit(name: impl Into<String>) -> Self {
        Self::new(name, CardKind::Debit)
    }

    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// true when charges on this card are collected through billing cycles
    pub fn is_billed_in_cycles(&self) -> bool {
        self.kind == CardKind::Credit
    }
}
