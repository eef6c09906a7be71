pub mod allocation;
pub mod events;

pub use allocation::{build_allocations, build_allocations_with, Allocation};
pub use events::{
    payment_events, payment_events_with, statement_lines, InstallmentBreakdown, PaymentEvent,
    StatementLine,
};
