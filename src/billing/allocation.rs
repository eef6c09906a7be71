use std::collections::hash_map::Entry;
use std::collections::HashMap;

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::calendar::{BusinessCalendar, MonthKey, WeekendsOnly};
use crate::cards::{BillingRule, Card, RuleTimeline};
use crate::config::EngineConfig;
use crate::decimal::{distribute_exact, Money};
use crate::errors::{EngineError, Result};
use crate::transactions::Transaction;
use crate::types::{CardId, TxId};

/// slice of a card transaction due on one payment date
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Allocation {
    pub card_id: CardId,
    pub tx_id: TxId,
    /// 1-based installment number
    pub installment_no: u32,
    pub installment_count: u32,
    /// month the statement carrying this slice closes in
    pub cycle: MonthKey,
    pub payment_date: NaiveDate,
    pub principal_part: Money,
    pub fee_part: Money,
}

impl Allocation {
    pub fn total(&self) -> Money {
        self.principal_part + self.fee_part
    }

    /// true when the slice comes from a multi-installment purchase
    pub fn is_installment(&self) -> bool {
        self.installment_count > 1
    }
}

/// Split every card transaction into its installments and place each one on
/// the payment date of its billing cycle.
///
/// Uses the default configuration and a weekends-only business calendar.
/// A transaction whose cycles fall outside the representable calendar yields
/// no allocations. Output is sorted by card, payment date, transaction and installment.
pub fn build_allocations(
    cards: &[Card],
    rules: &[BillingRule],
    transactions: &[Transaction],
) -> Result<Vec<Allocation>> {
    build_allocations_with(cards, rules, transactions, &EngineConfig::default(), &WeekendsOnly)
}

/// [`build_allocations`] with explicit configuration and business calendar
pub fn build_allocations_with<C: BusinessCalendar + ?Sized>(
    cards: &[Card],
    rules: &[BillingRule],
    transactions: &[Transaction],
    config: &EngineConfig,
    calendar: &C,
) -> Result<Vec<Allocation>> {
    let cards_by_id: HashMap<CardId, &Card> = cards.iter().map(|c| (c.id, c)).collect();
    let mut timelines: HashMap<CardId, RuleTimeline<'_>> = HashMap::new();
    let mut allocations = Vec::new();

    for tx in transactions {
        let Some(card_id) = tx.card_id else {
            continue;
        };
        let Some(card) = cards_by_id.get(&card_id) else {
            debug!("transaction {} references unknown card {}, skipped", tx.id, card_id);
            continue;
        };
        if config.credit_cards_only && !card.is_billed_in_cycles() {
            debug!("transaction {} is on {:?} card {}, settled immediately", tx.id, card.kind, card_id);
            continue;
        }

        tx.validate()?;

        let timeline = match timelines.entry(card_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(RuleTimeline::for_card(card_id, rules)?),
        };

        match allocate_transaction(tx, card_id, timeline, calendar) {
            Ok(placed) => allocations.extend(placed),
            Err(EngineError::InvalidDate { message }) => {
                debug!("transaction {} has no placeable cycle ({}), skipped", tx.id, message);
            }
            Err(err) => return Err(err),
        }
    }

    allocations.sort_by(|a, b| {
        (a.card_id, a.payment_date, a.tx_id, a.installment_no)
            .cmp(&(b.card_id, b.payment_date, b.tx_id, b.installment_no))
    });

    Ok(allocations)
}

/// Installments of one validated transaction.
///
/// Installment `k` is due in the cycle `k - 1` months after the first cycle
/// closing on or after the transaction date. The fee of each installment is
/// the monthly fee rate on the principal still unpaid before it.
fn allocate_transaction<C: BusinessCalendar + ?Sized>(
    tx: &Transaction,
    card_id: CardId,
    timeline: &RuleTimeline<'_>,
    calendar: &C,
) -> Result<Vec<Allocation>> {
    let first = timeline.first_cycle(tx.date, calendar)?;
    let total = tx.amount.abs();
    let rate = tx.fee_mode.monthly_rate();

    let mut outstanding = total;
    let mut allocations = Vec::with_capacity(tx.installment_count as usize);

    for (i, principal_part) in distribute_exact(total, tx.installment_count)
        .into_iter()
        .enumerate()
    {
        let dates = if i == 0 {
            first
        } else {
            timeline.cycle_dates(first.cycle.add_months(i as i32), calendar)?
        };

        let fee_part = outstanding.apply_rate(rate);
        outstanding -= principal_part;

        allocations.push(Allocation {
            card_id,
            tx_id: tx.id,
            installment_no: i as u32 + 1,
            installment_count: tx.installment_count,
            cycle: dates.cycle,
            payment_date: dates.payment_date,
            principal_part,
            fee_part,
        });
    }

    Ok(allocations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::DayOfMonth;
    use crate::decimal::Rate;
    use crate::transactions::FeeMode;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// credit card closing on the 14th, paying the 25th of the next month
    fn setup() -> (Card, Vec<BillingRule>) {
        let card = Card::credit("visa");
        let rules = vec![BillingRule::new(
            card.id,
            DayOfMonth::Day(14),
            DayOfMonth::Day(25),
            date(2024, 1, 1),
        )];
        (card, rules)
    }

    fn principal_sum(allocations: &[Allocation], tx: &Transaction) -> Money {
        allocations
            .iter()
            .filter(|a| a.tx_id == tx.id)
            .map(|a| a.principal_part)
            .sum()
    }

    #[test]
    fn test_fee_free_installments() {
        let (card, rules) = setup();
        let tx = Transaction::new(date(2024, 3, 1), Money::from_minor(300_000))
            .on_card(card.id)
            .installments(3, FeeMode::Free);

        let allocations = build_allocations(&[card.clone()], &rules, &[tx.clone()]).unwrap();

        assert_eq!(allocations.len(), 3);
        let dates: Vec<NaiveDate> = allocations.iter().map(|a| a.payment_date).collect();
        // 2024-05-25 is a saturday
        assert_eq!(dates, vec![date(2024, 4, 25), date(2024, 5, 24), date(2024, 6, 25)]);
        for (i, a) in allocations.iter().enumerate() {
            assert_eq!(a.installment_no, i as u32 + 1);
            assert_eq!(a.principal_part, Money::from_minor(100_000));
            assert_eq!(a.fee_part, Money::ZERO);
            assert!(a.is_installment());
        }
        assert_eq!(principal_sum(&allocations, &tx), Money::from_minor(300_000));
    }

    #[test]
    fn test_manual_fee_on_declining_balance() {
        let (card, rules) = setup();
        let tx = Transaction::new(date(2024, 3, 1), Money::from_minor(300_000))
            .on_card(card.id)
            .installments(
                3,
                FeeMode::Manual {
                    monthly_rate: Rate::from_percentage(dec!(1)),
                },
            );

        let allocations = build_allocations(&[card], &rules, &[tx]).unwrap();
        let fees: Vec<Money> = allocations.iter().map(|a| a.fee_part).collect();
        assert_eq!(
            fees,
            vec![Money::from_minor(3_000), Money::from_minor(2_000), Money::from_minor(1_000)]
        );
        assert_eq!(allocations[0].total(), Money::from_minor(103_000));
    }

    #[test]
    fn test_rounding_drift_and_sign() {
        let (card, rules) = setup();
        let tx = Transaction::new(date(2024, 3, 20), Money::from_minor(-100_000))
            .on_card(card.id)
            .installments(3, FeeMode::Free);

        let allocations = build_allocations(&[card], &rules, &[tx.clone()]).unwrap();
        let parts: Vec<Money> = allocations.iter().map(|a| a.principal_part).collect();
        assert_eq!(
            parts,
            vec![Money::from_minor(33_333), Money::from_minor(33_333), Money::from_minor(33_334)]
        );
        assert_eq!(principal_sum(&allocations, &tx), Money::from_minor(100_000));

        // posted after the march closing: first cycle is april
        assert_eq!(allocations[0].cycle, MonthKey::new(2024, 4).unwrap());
        assert_eq!(allocations[0].payment_date, date(2024, 5, 24));
    }

    #[test]
    fn test_single_payment_on_closing_date() {
        let (card, rules) = setup();
        let tx = Transaction::new(date(2024, 3, 14), Money::from_minor(42_000)).on_card(card.id);

        let allocations = build_allocations(&[card.clone()], &rules, &[tx.clone()]).unwrap();
        assert_eq!(
            allocations,
            vec![Allocation {
                card_id: card.id,
                tx_id: tx.id,
                installment_no: 1,
                installment_count: 1,
                cycle: MonthKey::new(2024, 3).unwrap(),
                payment_date: date(2024, 4, 25),
                principal_part: Money::from_minor(42_000),
                fee_part: Money::ZERO,
            }]
        );
        assert!(!allocations[0].is_installment());
    }

    #[test]
    fn test_skips_transactions_outside_card_billing() {
        let (card, rules) = setup();
        let debit = Card::debit("check card");
        let cash = Transaction::new(date(2024, 3, 2), Money::from_minor(1_000));
        let on_debit = Transaction::new(date(2024, 3, 2), Money::from_minor(2_000)).on_card(debit.id);
        let unknown = Transaction::new(date(2024, 3, 2), Money::from_minor(3_000)).on_card(uuid::Uuid::new_v4());

        let allocations = build_allocations(&[card, debit], &rules, &[cash, on_debit, unknown]).unwrap();
        assert!(allocations.is_empty());
    }

    #[test]
    fn test_inactive_card_still_allocates() {
        let (card, rules) = setup();
        let card = card.deactivated();
        let tx = Transaction::new(date(2024, 3, 2), Money::from_minor(1_000)).on_card(card.id);

        let allocations = build_allocations(&[card], &rules, &[tx]).unwrap();
        assert_eq!(allocations.len(), 1);
    }

    #[test]
    fn test_errors_are_hard_failures() {
        let (card, rules) = setup();
        let early = Transaction::new(date(2023, 12, 31), Money::from_minor(1_000)).on_card(card.id);
        assert!(matches!(
            build_allocations(&[card.clone()], &rules, &[early]),
            Err(EngineError::NoApplicableRule { .. })
        ));

        let broken = Transaction::new(date(2024, 3, 2), Money::from_minor(1_000))
            .on_card(card.id)
            .installments(0, FeeMode::Free);
        assert!(matches!(
            build_allocations(&[card], &rules, &[broken]),
            Err(EngineError::InvalidTerm { .. })
        ));
    }

    #[test]
    fn test_installments_follow_rule_changes() {
        let card = Card::credit("visa");
        let rules = vec![
            BillingRule::new(card.id, DayOfMonth::Day(14), DayOfMonth::Day(25), date(2024, 1, 1)),
            BillingRule::new(card.id, DayOfMonth::Day(1), DayOfMonth::Day(14), date(2024, 6, 10)),
        ];
        let tx = Transaction::new(date(2024, 5, 2), Money::from_minor(90_000))
            .on_card(card.id)
            .installments(3, FeeMode::Free);

        let allocations = build_allocations(&[card], &rules, &[tx]).unwrap();
        let dates: Vec<NaiveDate> = allocations.iter().map(|a| a.payment_date).collect();
        // may and june cycles close under the old rule, july under the new one
        assert_eq!(dates, vec![date(2024, 6, 25), date(2024, 7, 25), date(2024, 8, 14)]);
    }

    #[test]
    fn test_charge_after_rule_switch_uses_new_rule() {
        let card = Card::credit("visa");
        let rules = vec![
            BillingRule::new(card.id, DayOfMonth::Day(14), DayOfMonth::Day(25), date(2024, 1, 1)),
            BillingRule::new(card.id, DayOfMonth::Day(1), DayOfMonth::Day(14), date(2024, 6, 10)),
        ];
        let tx = Transaction::new(date(2024, 6, 12), Money::from_minor(40_000))
            .on_card(card.id)
            .installments(2, FeeMode::Free);

        let allocations = build_allocations(&[card], &rules, &[tx]).unwrap();
        let placed: Vec<(MonthKey, NaiveDate)> =
            allocations.iter().map(|a| (a.cycle, a.payment_date)).collect();
        // new rule closes 07-01, its june closing already passed
        assert_eq!(
            placed,
            vec![
                (MonthKey::new(2024, 7).unwrap(), date(2024, 8, 14)),
                (MonthKey::new(2024, 8).unwrap(), date(2024, 9, 13)),
            ]
        );
    }

    #[test]
    fn test_unplaceable_transaction_yields_nothing() {
        let (card, rules) = setup();
        let far = Transaction::new(NaiveDate::MAX, Money::from_minor(5_000)).on_card(card.id);
        let near = Transaction::new(date(2024, 3, 1), Money::from_minor(7_000)).on_card(card.id);

        let allocations = build_allocations(&[card], &rules, &[far.clone(), near.clone()]).unwrap();
        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations[0].tx_id, near.id);
        assert!(allocations.iter().all(|a| a.tx_id != far.id));
    }

    #[test]
    fn test_order_independent_and_idempotent() {
        let (card, rules) = setup();
        let other = Card::credit("master");
        let mut all_rules = rules.clone();
        all_rules.push(BillingRule::new(other.id, DayOfMonth::EndOfMonth, DayOfMonth::Day(10), date(2024, 1, 1)));

        let txs = vec![
            Transaction::new(date(2024, 3, 1), Money::from_minor(60_000))
                .on_card(card.id)
                .installments(2, FeeMode::Free),
            Transaction::new(date(2024, 3, 5), Money::from_minor(7_000)).on_card(other.id),
            Transaction::new(date(2024, 4, 20), Money::from_minor(12_345))
                .on_card(card.id)
                .installments(5, FeeMode::Free),
        ];
        let cards = vec![card, other];

        let forward = build_allocations(&cards, &all_rules, &txs).unwrap();
        let mut reversed_txs = txs.clone();
        reversed_txs.reverse();
        let backward = build_allocations(&cards, &all_rules, &reversed_txs).unwrap();

        assert_eq!(forward, backward);
        assert_eq!(forward, build_allocations(&cards, &all_rules, &txs).unwrap());
        assert_eq!(forward.len(), 8);
    }
}
