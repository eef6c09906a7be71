use uuid::Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a payment card
pub type CardId = Uuid;

/// unique identifier for a ledger transaction
pub type TxId = Uuid;

/// unique identifier for a billing rule version
pub type RuleId = Uuid;
