use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::{DayOfMonth, WeekendPolicy};
use crate::decimal::{Money, Rate};
use crate::errors::{EngineError, Result};
use crate::types::LoanId;

/// repayment method for fixed-term loans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepaymentMethod {
    /// principal split evenly, interest shrinks with the balance
    EqualPrincipal,
    /// constant total payment, principal share grows over time
    Annuity,
}

/// fixed-term loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub name: String,
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_months: u32,
    pub start_date: NaiveDate,
    pub payment_day: DayOfMonth,
    pub weekend_adjust: WeekendPolicy,
    pub method: RepaymentMethod,
    #[serde(default)]
    pub memo: String,
}

impl Loan {
    pub fn builder() -> LoanBuilder {
        LoanBuilder::new()
    }

    /// reject loans that cannot produce a schedule
    pub fn validate(&self) -> Result<()> {
        if !self.principal.is_positive() {
            return Err(EngineError::InvalidAmount {
                amount: self.principal,
            });
        }

        if self.term_months == 0 {
            return Err(EngineError::InvalidTerm {
                term: self.term_months,
            });
        }

        if self.annual_rate.is_negative() {
            return Err(EngineError::InvalidInterestRate {
                rate: self.annual_rate,
            });
        }

        Ok(())
    }

    /// monthly rate used for interest portions
    pub fn monthly_rate(&self) -> Rate {
        self.annual_rate.monthly_rate()
    }
}

/// builder for loans
#[derive(Debug, Default)]
pub struct LoanBuilder {
    id: Option<LoanId>,
    name: Option<String>,
    principal: Option<Money>,
    annual_rate: Option<Rate>,
    term_months: Option<u32>,
    start_date: Option<NaiveDate>,
    payment_day: Option<DayOfMonth>,
    weekend_adjust: Option<WeekendPolicy>,
    method: Option<RepaymentMethod>,
    memo: Option<String>,
}

impl LoanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// keep an existing identity, e.g. when rebuilding an edited loan
    pub fn id(mut self, id: LoanId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn principal(mut self, principal: Money) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn annual_rate(mut self, rate: Rate) -> Self {
        self.annual_rate = Some(rate);
        self
    }

    pub fn term_months(mut self, months: u32) -> Self {
        self.term_months = Some(months);
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn payment_day(mut self, day: DayOfMonth) -> Self {
        self.payment_day = Some(day);
        self
    }

    pub fn weekend_adjust(mut self, policy: WeekendPolicy) -> Self {
        self.weekend_adjust = Some(policy);
        self
    }

    pub fn method(mut self, method: RepaymentMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// build and validate; payment day defaults to the start date's day
    pub fn build(self) -> Result<Loan> {
        let principal = self.principal.ok_or(EngineError::InvalidConfiguration {
            message: "Principal required".to_string(),
        })?;

        let annual_rate = self.annual_rate.ok_or(EngineError::InvalidConfiguration {
            message: "Rate required".to_string(),
        })?;

        let term_months = self.term_months.ok_or(EngineError::InvalidConfiguration {
            message: "Term required".to_string(),
        })?;

        let start_date = self.start_date.ok_or(EngineError::InvalidConfiguration {
            message: "Start date required".to_string(),
        })?;

        let payment_day = match self.payment_day {
            Some(day) => day,
            None => DayOfMonth::day(start_date.day())?,
        };

        let loan = Loan {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            name: self.name.unwrap_or_default(),
            principal,
            annual_rate,
            term_months,
            start_date,
            payment_day,
            weekend_adjust: self.weekend_adjust.unwrap_or_default(),
            method: self.method.unwrap_or(RepaymentMethod::EqualPrincipal),
            memo: self.memo.unwrap_or_default(),
        };

        loan.validate()?;
        Ok(loan)
    }
}
