pub mod loan;
pub mod schedule;

pub use loan::{Loan, LoanBuilder, RepaymentMethod};
pub use schedule::{build_schedule, build_schedule_with, sum_month, LoanSchedule, MonthlyRepayment, ScheduleRow};
