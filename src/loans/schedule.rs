use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar::{BusinessCalendar, MonthKey, WeekendsOnly};
use crate::decimal::{distribute_exact, Money, Rate};
use crate::errors::Result;
use crate::loans::loan::{Loan, RepaymentMethod};
use crate::types::LoanId;

/// one installment of a loan repayment table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
    /// 1-based installment number
    pub installment: u32,
    /// payment day of the month, clamped to the month's length
    pub payment_date: NaiveDate,
    /// payment date moved by the loan's weekend policy
    pub due_date: NaiveDate,
    pub principal_pay: Money,
    pub interest_pay: Money,
    pub total_pay: Money,
    /// balance left after this installment
    pub remaining: Money,
}

/// Build the repayment table for a loan.
///
/// Interest is charged monthly on the outstanding balance. Every amount is
/// rounded to a whole unit as it is computed and the final installment pays off
/// whatever is left, so principal portions always sum to the loan principal.
/// A schedule that would run past the representable calendar comes back empty.
pub fn build_schedule(loan: &Loan) -> Result<Vec<ScheduleRow>> {
    build_schedule_with(loan, &WeekendsOnly)
}

/// [`build_schedule`] with a custom business calendar for due dates
pub fn build_schedule_with<C: BusinessCalendar + ?Sized>(
    loan: &Loan,
    calendar: &C,
) -> Result<Vec<ScheduleRow>> {
    loan.validate()?;

    let term = loan.term_months;
    let rate = loan.monthly_rate();

    let equal_parts = match loan.method {
        RepaymentMethod::EqualPrincipal => distribute_exact(loan.principal, term),
        RepaymentMethod::Annuity => Vec::new(),
    };
    let annuity = annuity_payment(loan.principal, rate, term);

    let mut rows = Vec::with_capacity(term as usize);
    let mut month = MonthKey::from_date(loan.start_date);
    let mut remaining = loan.principal;

    for i in 1..=term {
        let Some(payment_date) = month.date_for(loan.payment_day) else {
            debug!("loan {}: installment {} falls outside the calendar, no schedule", loan.id, i);
            return Ok(Vec::new());
        };

        let interest_pay = remaining.apply_rate(rate);
        let scheduled = match loan.method {
            RepaymentMethod::EqualPrincipal => equal_parts[(i - 1) as usize],
            RepaymentMethod::Annuity => (annuity - interest_pay).max(Money::ZERO),
        };

        // last installment clears the balance
        let principal_pay = if i == term {
            remaining
        } else {
            scheduled.min(remaining)
        };
        remaining -= principal_pay;

        rows.push(ScheduleRow {
            installment: i,
            payment_date,
            due_date: loan.weekend_adjust.adjust(payment_date, calendar),
            principal_pay,
            interest_pay,
            total_pay: principal_pay + interest_pay,
            remaining,
        });

        month = month.next();
    }

    Ok(rows)
}

/// constant monthly payment of an annuity loan, from the initial principal
fn annuity_payment(principal: Money, monthly_rate: Rate, months: u32) -> Money {
    if months == 0 {
        return principal;
    }

    if monthly_rate.is_zero() {
        return principal / Decimal::from(months);
    }

    // payment = P * r * (1 + r)^n / ((1 + r)^n - 1)
    let r = monthly_rate.as_decimal();
    let base = Decimal::ONE + r;
    let mut compound = Decimal::ONE;
    for _ in 0..months {
        match compound.checked_mul(base) {
            Some(next) => compound = next,
            // (1 + r)^n beyond decimal range: the factor has converged to r
            None => return principal.apply_rate(monthly_rate),
        }
    }

    Money::from_decimal(principal.as_decimal() * r * (compound / (compound - Decimal::ONE)))
}

/// repayments falling in one calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyRepayment {
    pub month: MonthKey,
    pub principal: Money,
    pub interest: Money,
    pub total: Money,
    pub rows: Vec<ScheduleRow>,
}

/// sum the rows whose payment date falls in `month`
pub fn sum_month(rows: &[ScheduleRow], month: MonthKey) -> MonthlyRepayment {
    let rows: Vec<ScheduleRow> = rows
        .iter()
        .filter(|r| month.contains(r.payment_date))
        .cloned()
        .collect();

    let principal: Money = rows.iter().map(|r| r.principal_pay).sum();
    let interest: Money = rows.iter().map(|r| r.interest_pay).sum();

    MonthlyRepayment {
        month,
        principal,
        interest,
        total: principal + interest,
        rows,
    }
}

/// repayment table with totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanSchedule {
    pub loan_id: LoanId,
    pub principal: Money,
    pub rows: Vec<ScheduleRow>,
    pub total_interest: Money,
    pub total_payment: Money,
}

impl LoanSchedule {
    /// generate the schedule for a loan
    pub fn generate(loan: &Loan) -> Result<Self> {
        Self::generate_with(loan, &WeekendsOnly)
    }

    /// generate with a custom business calendar for due dates
    pub fn generate_with<C: BusinessCalendar + ?Sized>(loan: &Loan, calendar: &C) -> Result<Self> {
        let rows = build_schedule_with(loan, calendar)?;

        let total_interest = rows.iter().map(|r| r.interest_pay).sum();
        let total_payment = rows.iter().map(|r| r.total_pay).sum();

        Ok(Self {
            loan_id: loan.id,
            principal: loan.principal,
            rows,
            total_interest,
            total_payment,
        })
    }

    /// row for a 1-based installment number
    pub fn get_row(&self, installment: u32) -> Option<&ScheduleRow> {
        installment
            .checked_sub(1)
            .and_then(|i| self.rows.get(i as usize))
    }

    /// balance after an installment, the full principal before the first one
    pub fn balance_after(&self, installment: u32) -> Money {
        self.get_row(installment)
            .map(|r| r.remaining)
            .unwrap_or(self.principal)
    }

    /// first row due on or after `date`
    pub fn next_due(&self, date: NaiveDate) -> Option<&ScheduleRow> {
        self.rows.iter().find(|r| r.due_date >= date)
    }

    pub fn month(&self, month: MonthKey) -> MonthlyRepayment {
        sum_month(&self.rows, month)
    }
}
