use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::{BusinessCalendar, DayOfMonth, MonthKey, WeekendPolicy, WeekendsOnly};
use crate::cards::card::Card;
use crate::errors::{EngineError, Result};
use crate::types::{CardId, RuleId};

fn default_payment_month_offset() -> u32 {
    1
}

/// one version of a card's billing terms, in force from `effective_from`
/// until the next version of the same card takes over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingRule {
    pub id: RuleId,
    pub card_id: CardId,
    /// statement closing day
    pub closing_day: DayOfMonth,
    /// day the closed statement is collected
    pub payment_day: DayOfMonth,
    /// months from the closing month to the payment month
    #[serde(default = "default_payment_month_offset")]
    pub payment_month_offset: u32,
    #[serde(default)]
    pub weekend_adjust: WeekendPolicy,
    pub effective_from: NaiveDate,
}

impl BillingRule {
    /// rule paying the month after closing, moved back off weekends
    pub fn new(
        card_id: CardId,
        closing_day: DayOfMonth,
        payment_day: DayOfMonth,
        effective_from: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_id,
            closing_day,
            payment_day,
            payment_month_offset: default_payment_month_offset(),
            weekend_adjust: WeekendPolicy::default(),
            effective_from,
        }
    }

    pub fn with_payment_month_offset(mut self, months: u32) -> Self {
        self.payment_month_offset = months;
        self
    }

    pub fn with_weekend_adjust(mut self, policy: WeekendPolicy) -> Self {
        self.weekend_adjust = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.payment_month_offset > 12 {
            return Err(EngineError::InvalidConfiguration {
                message: format!(
                    "payment month offset {} exceeds a year",
                    self.payment_month_offset
                ),
            });
        }

        if self.payment_month_offset == 0 {
            if let (DayOfMonth::Day(closing), DayOfMonth::Day(payment)) =
                (self.closing_day, self.payment_day)
            {
                if payment < closing {
                    return Err(EngineError::InvalidConfiguration {
                        message: format!(
                            "payment day {} precedes closing day {} in the same month",
                            payment, closing
                        ),
                    });
                }
            }
        }

        Ok(())
    }

    /// statement closing date of a cycle; closings are not weekend-adjusted
    pub fn closing_date(&self, cycle: MonthKey) -> Option<NaiveDate> {
        cycle.date_for(self.closing_day)
    }

    /// closing and payment dates of the cycle closing in `cycle`
    pub fn cycle_dates_with<C: BusinessCalendar + ?Sized>(
        &self,
        cycle: MonthKey,
        calendar: &C,
    ) -> Option<CycleDates> {
        let closing_date = self.closing_date(cycle)?;
        let payment_month = cycle.add_months(self.payment_month_offset as i32);
        let nominal_payment = payment_month.date_for(self.payment_day)?;

        Some(CycleDates {
            cycle,
            closing_date,
            payment_date: self.weekend_adjust.adjust(nominal_payment, calendar),
            rule_id: self.id,
        })
    }
}

/// closing and payment dates of one statement cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CycleDates {
    /// month the statement closes in
    pub cycle: MonthKey,
    pub closing_date: NaiveDate,
    pub payment_date: NaiveDate,
    /// rule that produced the dates
    pub rule_id: RuleId,
}

/// closing and payment dates for the cycle closing in `year`/`month`
pub fn cycle_dates(rule: &BillingRule, year: i32, month: u32) -> Result<CycleDates> {
    let cycle = MonthKey::new(year, month)?;
    rule.cycle_dates_with(cycle, &WeekendsOnly)
        .ok_or_else(|| out_of_calendar(cycle))
}

/// select the billing rule in force for a card on a date
pub fn resolve_rule<'a>(
    card: &Card,
    rules: &'a [BillingRule],
    at: NaiveDate,
) -> Result<&'a BillingRule> {
    RuleTimeline::for_card(card.id, rules)?.resolve(at)
}

fn out_of_calendar(cycle: MonthKey) -> EngineError {
    EngineError::InvalidDate {
        message: format!("cycle {} is outside the supported calendar", cycle),
    }
}

/// Ordered, non-overlapping history of one card's billing rules.
///
/// Lookups by date pick the latest rule whose `effective_from` is on or before
/// the date, and a charge's first cycle is laid out with that rule. Lookups by
/// cycle pick the latest rule that was already in force on its own closing
/// date for that cycle, so adding a rule never moves cycles that closed before
/// it took effect.
#[derive(Debug, Clone)]
pub struct RuleTimeline<'a> {
    card_id: CardId,
    rules: Vec<&'a BillingRule>,
}

impl<'a> RuleTimeline<'a> {
    /// collect and order the rules of one card
    pub fn for_card(card_id: CardId, rules: &'a [BillingRule]) -> Result<Self> {
        let mut own: Vec<&'a BillingRule> = rules.iter().filter(|r| r.card_id == card_id).collect();
        own.sort_by_key(|r| r.effective_from);

        for pair in own.windows(2) {
            if pair[0].effective_from == pair[1].effective_from {
                return Err(EngineError::OverlappingRules {
                    card_id,
                    effective_from: pair[0].effective_from,
                });
            }
        }
        for rule in &own {
            rule.validate()?;
        }

        Ok(Self { card_id, rules: own })
    }

    pub fn card_id(&self) -> CardId {
        self.card_id
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[&'a BillingRule] {
        &self.rules
    }

    pub fn earliest(&self) -> Option<&'a BillingRule> {
        self.rules.first().copied()
    }

    /// rule in force on `at`; the effective-from day itself is inclusive
    pub fn resolve(&self, at: NaiveDate) -> Result<&'a BillingRule> {
        self.rules
            .iter()
            .rev()
            .find(|r| r.effective_from <= at)
            .copied()
            .ok_or(EngineError::NoApplicableRule {
                card_id: self.card_id,
                date: at,
            })
    }

    /// day the next rule takes over, `None` for the latest rule
    pub fn effective_until(&self, rule: &BillingRule) -> Option<NaiveDate> {
        self.rules
            .iter()
            .find(|r| r.effective_from > rule.effective_from)
            .map(|r| r.effective_from)
    }

    /// rule governing the cycle that closes in `cycle`
    pub fn rule_for_cycle(&self, cycle: MonthKey) -> Result<&'a BillingRule> {
        self.rules
            .iter()
            .rev()
            .find(|r| {
                r.closing_date(cycle)
                    .map_or(false, |closing| closing >= r.effective_from)
            })
            .copied()
            .ok_or_else(|| EngineError::NoApplicableRule {
                card_id: self.card_id,
                date: cycle.last_day().unwrap_or(NaiveDate::MIN),
            })
    }

    /// dates of the cycle that closes in `cycle`
    pub fn cycle_dates<C: BusinessCalendar + ?Sized>(
        &self,
        cycle: MonthKey,
        calendar: &C,
    ) -> Result<CycleDates> {
        self.rule_for_cycle(cycle)?
            .cycle_dates_with(cycle, calendar)
            .ok_or_else(|| out_of_calendar(cycle))
    }

    /// like [`RuleTimeline::cycle_dates`], laying out cycles before the first
    /// rule with the earliest rule
    pub fn cycle_dates_or_earliest<C: BusinessCalendar + ?Sized>(
        &self,
        cycle: MonthKey,
        calendar: &C,
    ) -> Result<CycleDates> {
        let rule = match self.rule_for_cycle(cycle) {
            Ok(rule) => rule,
            Err(err) => self.earliest().ok_or(err)?,
        };
        rule.cycle_dates_with(cycle, calendar)
            .ok_or_else(|| out_of_calendar(cycle))
    }

    /// Earliest cycle whose closing date is on or after `date`, laid out with
    /// the rule in force on `date`.
    ///
    /// A charge on the closing date itself belongs to the closing cycle. Fails
    /// with `NoApplicableRule` when `date` precedes every rule of the card.
    pub fn first_cycle<C: BusinessCalendar + ?Sized>(
        &self,
        date: NaiveDate,
        calendar: &C,
    ) -> Result<CycleDates> {
        let rule = self.resolve(date)?;

        let month = MonthKey::from_date(date);
        let cycle = match rule.closing_date(month) {
            Some(closing) if closing >= date => month,
            _ => month.next(),
        };
        rule.cycle_dates_with(cycle, calendar)
            .ok_or_else(|| out_of_calendar(cycle))
    }

    /// like [`RuleTimeline::first_cycle`], falling back to the earliest rule
    /// when `date` precedes the timeline
    pub fn current_cycle<C: BusinessCalendar + ?Sized>(
        &self,
        date: NaiveDate,
        calendar: &C,
    ) -> Result<CycleDates> {
        let month = MonthKey::from_date(date);
        let dates = self.cycle_dates_or_earliest(month, calendar)?;
        if dates.closing_date >= date {
            return Ok(dates);
        }
        self.cycle_dates_or_earliest(month.next(), calendar)
    }
}
