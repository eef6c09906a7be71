pub mod billing;
pub mod calendar;
pub mod cards;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod loans;
pub mod transactions;
pub mod types;

// re-export key types
pub use billing::{
    build_allocations, payment_events, statement_lines, Allocation, InstallmentBreakdown,
    PaymentEvent, StatementLine,
};
pub use calendar::{
    days_in_month, make_date, parse_date, to_key, BusinessCalendar, DayOfMonth, MonthKey,
    WeekendPolicy, WeekendsOnly,
};
pub use cards::{cycle_dates, resolve_rule, ActualStatement, BillingRule, Card, CardKind, CycleDates, RuleTimeline};
pub use config::{EngineConfig, EventWindow};
pub use decimal::{distribute_exact, Money, Rate};
pub use engine::BillingEngine;
pub use errors::{EngineError, Result};
pub use loans::{build_schedule, sum_month, Loan, LoanSchedule, MonthlyRepayment, RepaymentMethod, ScheduleRow};
pub use transactions::{FeeMode, Transaction};
pub use types::{CardId, LoanId, RuleId, TxId};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
