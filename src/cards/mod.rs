pub mod card;
pub mod rules;
pub mod statement;

pub use card::{Card, CardKind};
pub use rules::{cycle_dates, resolve_rule, BillingRule, CycleDates, RuleTimeline};
pub use statement::ActualStatement;
