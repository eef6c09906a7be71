use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::billing::allocation::{build_allocations_with, Allocation};
use crate::calendar::{BusinessCalendar, MonthKey, WeekendsOnly};
use crate::cards::{ActualStatement, BillingRule, Card, CycleDates, RuleTimeline};
use crate::config::{EngineConfig, EventWindow};
use crate::decimal::Money;
use crate::errors::Result;
use crate::transactions::Transaction;
use crate::types::{CardId, TxId};

/// split of an event's principal by where it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstallmentBreakdown {
    /// principal from multi-installment purchases
    pub installment_this_payment: Money,
    /// principal from single-payment charges of the cycle
    pub one_off_this_payment: Money,
}

/// expected bill of one card on one payment date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub card_id: CardId,
    pub cycle: MonthKey,
    pub closing_date: NaiveDate,
    pub payment_date: NaiveDate,
    pub expected_principal: Money,
    pub expected_fee: Money,
    pub expected: Money,
    pub installment: InstallmentBreakdown,
    /// number of allocations landing on this event
    pub allocation_count: usize,
    /// amount the issuer billed for this payment, when recorded
    pub actual: Option<Money>,
}

impl PaymentEvent {
    fn empty(card_id: CardId, dates: CycleDates) -> Self {
        Self {
            card_id,
            cycle: dates.cycle,
            closing_date: dates.closing_date,
            payment_date: dates.payment_date,
            expected_principal: Money::ZERO,
            expected_fee: Money::ZERO,
            expected: Money::ZERO,
            installment: InstallmentBreakdown::default(),
            allocation_count: 0,
            actual: None,
        }
    }

    fn add(&mut self, allocation: &Allocation) {
        self.expected_principal += allocation.principal_part;
        self.expected_fee += allocation.fee_part;
        self.expected += allocation.total();
        if allocation.is_installment() {
            self.installment.installment_this_payment += allocation.principal_part;
        } else {
            self.installment.one_off_this_payment += allocation.principal_part;
        }
        self.allocation_count += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.allocation_count == 0
    }

    /// actual minus expected, `None` without a recorded statement
    pub fn variance(&self) -> Option<Money> {
        self.actual.map(|actual| actual - self.expected)
    }
}

/// Expected payment events of every active card over a window of cycles.
///
/// The window spans `past_months` cycles before the cycle that contains
/// `today` through `future_months` cycles after it, with one event per card and
/// cycle even when nothing is due. Events are sorted by payment date. A window
/// wider than a century on either side fails with `InvalidConfiguration`.
pub fn payment_events(
    cards: &[Card],
    rules: &[BillingRule],
    transactions: &[Transaction],
    actual_statements: &[ActualStatement],
    past_months: u32,
    future_months: u32,
    today: NaiveDate,
) -> Result<Vec<PaymentEvent>> {
    payment_events_with(
        cards,
        rules,
        transactions,
        actual_statements,
        EventWindow::new(past_months, future_months),
        today,
        &EngineConfig::default(),
        &WeekendsOnly,
    )
}

/// [`payment_events`] with explicit configuration and business calendar
#[allow(clippy::too_many_arguments)]
pub fn payment_events_with<C: BusinessCalendar + ?Sized>(
    cards: &[Card],
    rules: &[BillingRule],
    transactions: &[Transaction],
    actual_statements: &[ActualStatement],
    window: EventWindow,
    today: NaiveDate,
    config: &EngineConfig,
    calendar: &C,
) -> Result<Vec<PaymentEvent>> {
    window.validate()?;
    let allocations = build_allocations_with(cards, rules, transactions, config, calendar)?;

    let mut by_cycle: HashMap<(CardId, MonthKey), Vec<&Allocation>> = HashMap::new();
    for allocation in &allocations {
        by_cycle
            .entry((allocation.card_id, allocation.cycle))
            .or_default()
            .push(allocation);
    }

    let mut events = Vec::new();
    let billed = cards
        .iter()
        .filter(|c| c.active && (!config.credit_cards_only || c.is_billed_in_cycles()));

    for card in billed {
        let timeline = RuleTimeline::for_card(card.id, rules)?;
        if timeline.is_empty() {
            warn!("card {} has no billing rule, no payment events", card.id);
            continue;
        }

        let current = timeline.current_cycle(today, calendar)?;
        let past = window.past_months as i32;
        let future = window.future_months as i32;

        for offset in -past..=future {
            let dates = timeline.cycle_dates_or_earliest(current.cycle.add_months(offset), calendar)?;
            let mut event = PaymentEvent::empty(card.id, dates);

            if let Some(landed) = by_cycle.get(&(card.id, dates.cycle)) {
                for allocation in landed {
                    event.add(allocation);
                }
            }
            events.push(event);
        }
    }

    events.sort_by(|a, b| {
        (a.payment_date, a.card_id, a.cycle).cmp(&(b.payment_date, b.card_id, b.cycle))
    });
    attach_actuals(&mut events, actual_statements);

    Ok(events)
}

/// Credit every recorded statement to one event of its card paid in the same
/// month. When several cycles pay in that month the event nearest to the
/// statement date takes it, the earlier one on a tie.
fn attach_actuals(events: &mut [PaymentEvent], statements: &[ActualStatement]) {
    for statement in statements {
        let target = events
            .iter_mut()
            .filter(|e| statement.is_due_in(e.card_id, MonthKey::from_date(e.payment_date)))
            .min_by_key(|e| statement.days_from(e.payment_date));

        if let Some(event) = target {
            event.actual = Some(event.actual.unwrap_or(Money::ZERO) + statement.amount);
        }
    }
}

/// one transaction's share of a payment event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLine {
    pub tx_id: TxId,
    /// `None` when the transaction is no longer in the ledger
    pub tx_date: Option<NaiveDate>,
    pub principal: Money,
    pub fee: Money,
    pub total: Money,
    pub installment_no: u32,
    pub installment_count: u32,
}

/// per-transaction breakdown of an event, newest transaction first
pub fn statement_lines(
    allocations: &[Allocation],
    transactions: &[Transaction],
    event: &PaymentEvent,
) -> Vec<StatementLine> {
    let dates: HashMap<TxId, NaiveDate> = transactions.iter().map(|t| (t.id, t.date)).collect();
    let mut lines: Vec<StatementLine> = Vec::new();

    let landed = allocations
        .iter()
        .filter(|a| a.card_id == event.card_id && a.cycle == event.cycle);

    for allocation in landed {
        match lines.iter_mut().find(|l| l.tx_id == allocation.tx_id) {
            Some(line) => {
                line.principal += allocation.principal_part;
                line.fee += allocation.fee_part;
                line.total += allocation.total();
            }
            None => lines.push(StatementLine {
                tx_id: allocation.tx_id,
                tx_date: dates.get(&allocation.tx_id).copied(),
                principal: allocation.principal_part,
                fee: allocation.fee_part,
                total: allocation.total(),
                installment_no: allocation.installment_no,
                installment_count: allocation.installment_count,
            }),
        }
    }

    lines.sort_by_key(|l| (Reverse(l.tx_date), l.tx_id));
    lines
}
