use chrono::NaiveDate;
use hourglass_rs::{SafeTimeProvider, TimeSource};

use crate::billing::{build_allocations_with, payment_events_with, Allocation, PaymentEvent};
use crate::calendar::{BusinessCalendar, WeekendsOnly};
use crate::cards::{ActualStatement, BillingRule, Card, RuleTimeline};
use crate::config::EngineConfig;
use crate::errors::Result;
use crate::loans::{Loan, LoanSchedule};
use crate::transactions::Transaction;
use crate::types::CardId;

/// Entry point binding configuration, a business calendar and a clock.
///
/// The clock is only read to produce the reference date of the event window;
/// every calculation underneath takes that date as a plain argument.
pub struct BillingEngine<C: BusinessCalendar = WeekendsOnly> {
    config: EngineConfig,
    calendar: C,
    time: SafeTimeProvider,
}

impl BillingEngine<WeekendsOnly> {
    /// engine on system time with a weekends-only calendar
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            calendar: WeekendsOnly,
            time: SafeTimeProvider::new(TimeSource::System),
        })
    }
}

impl<C: BusinessCalendar> BillingEngine<C> {
    /// swap the business calendar, e.g. for one that knows holidays
    pub fn with_calendar<D: BusinessCalendar>(self, calendar: D) -> BillingEngine<D> {
        BillingEngine {
            config: self.config,
            calendar,
            time: self.time,
        }
    }

    pub fn with_time(mut self, time: SafeTimeProvider) -> Self {
        self.time = time;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// reference date for window computations
    pub fn today(&self) -> NaiveDate {
        self.time.now().date_naive()
    }

    pub fn schedule(&self, loan: &Loan) -> Result<LoanSchedule> {
        LoanSchedule::generate_with(loan, &self.calendar)
    }

    pub fn resolve_rule<'a>(
        &self,
        card: &Card,
        rules: &'a [BillingRule],
        at: NaiveDate,
    ) -> Result<&'a BillingRule> {
        RuleTimeline::for_card(card.id, rules)?.resolve(at)
    }

    pub fn allocations(
        &self,
        cards: &[Card],
        rules: &[BillingRule],
        transactions: &[Transaction],
    ) -> Result<Vec<Allocation>> {
        build_allocations_with(cards, rules, transactions, &self.config, &self.calendar)
    }

    /// events over the configured window around today
    pub fn payment_events(
        &self,
        cards: &[Card],
        rules: &[BillingRule],
        transactions: &[Transaction],
        actual_statements: &[ActualStatement],
    ) -> Result<Vec<PaymentEvent>> {
        payment_events_with(
            cards,
            rules,
            transactions,
            actual_statements,
            self.config.window,
            self.today(),
            &self.config,
            &self.calendar,
        )
    }

    /// first event of a card paid today or later
    pub fn upcoming_event<'a>(
        &self,
        events: &'a [PaymentEvent],
        card_id: CardId,
    ) -> Option<&'a PaymentEvent> {
        let today = self.today();
        events
            .iter()
            .filter(|e| e.card_id == card_id)
            .find(|e| e.payment_date >= today)
    }
}
