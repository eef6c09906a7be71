//! Property tests for the calculation invariants of loan schedules, card
//! allocations and payment events, using `proptest` for input generation.

use proptest::prelude::*;
use repayment_engine_rs::chrono::NaiveDate;
use repayment_engine_rs::{
    build_allocations, build_schedule, payment_events, BillingRule, Card, DayOfMonth, Decimal,
    FeeMode, Loan, Money, Rate, RepaymentMethod, Transaction,
};

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2024i32..2027, 1u32..=12, 1u32..=31).prop_map(|(y, m, d)| {
        let last = repayment_engine_rs::days_in_month(y, m);
        NaiveDate::from_ymd_opt(y, m, d.min(last)).unwrap()
    })
}

fn arb_day() -> impl Strategy<Value = DayOfMonth> {
    prop_oneof![
        (1u8..=31).prop_map(DayOfMonth::Day),
        Just(DayOfMonth::EndOfMonth),
    ]
}

fn arb_method() -> impl Strategy<Value = RepaymentMethod> {
    prop_oneof![
        Just(RepaymentMethod::EqualPrincipal),
        Just(RepaymentMethod::Annuity),
    ]
}

/// annual rate in hundredths of a percent, 0% to 30%
fn arb_loan(max_rate_bp: i64) -> impl Strategy<Value = Loan> {
    (
        1i64..5_000_000_000,
        0i64..=max_rate_bp,
        1u32..=240,
        arb_date(),
        arb_day(),
        arb_method(),
    )
        .prop_map(|(principal, rate_bp, term, start, day, method)| {
            Loan::builder()
                .principal(Money::from_minor(principal))
                .annual_rate(Rate::from_percentage(Decimal::new(rate_bp, 2)))
                .term_months(term)
                .start_date(start)
                .payment_day(day)
                .method(method)
                .build()
                .unwrap()
        })
}

fn card_with_rule(closing: DayOfMonth, payment: DayOfMonth) -> (Card, Vec<BillingRule>) {
    let card = Card::credit("card");
    let rules = vec![BillingRule::new(
        card.id,
        closing,
        payment,
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
    )];
    (card, rules)
}

fn arb_fee_mode() -> impl Strategy<Value = FeeMode> {
    prop_oneof![
        Just(FeeMode::Free),
        (0i64..=300).prop_map(|bp| FeeMode::Manual {
            monthly_rate: Rate::from_percentage(Decimal::new(bp, 2)),
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Principal portions of every schedule sum to the loan principal exactly,
    /// the balance never grows and the last row clears it. Rebuilding gives the
    /// same rows.
    #[test]
    fn prop_schedule_pays_exact_principal(loan in arb_loan(3_000)) {
        let rows = build_schedule(&loan).unwrap();

        prop_assert_eq!(rows.len(), loan.term_months as usize);
        let paid: Money = rows.iter().map(|r| r.principal_pay).sum();
        prop_assert_eq!(paid, loan.principal);
        prop_assert_eq!(rows.last().unwrap().remaining, Money::ZERO);

        let mut previous = loan.principal;
        for row in &rows {
            prop_assert!(row.remaining <= previous);
            prop_assert!(!row.principal_pay.is_negative());
            prop_assert_eq!(row.total_pay, row.principal_pay + row.interest_pay);
            previous = row.remaining;
        }

        prop_assert_eq!(build_schedule(&loan).unwrap(), rows);
    }

    /// At zero rate there is no interest and every installment but the last
    /// repays the same rounded share, as long as those shares fit the principal.
    #[test]
    fn prop_zero_rate_schedule(loan in arb_loan(0)) {
        let rows = build_schedule(&loan).unwrap();

        prop_assert!(rows.iter().all(|r| r.interest_pay.is_zero()));

        let share = loan.principal / Decimal::from(loan.term_months);
        if share * Decimal::from(loan.term_months - 1) <= loan.principal {
            for row in &rows[..rows.len() - 1] {
                prop_assert_eq!(row.principal_pay, share);
            }
        }
    }

    /// Every transaction yields `installment_count` allocations whose principal
    /// parts sum to the absolute amount, due on strictly later payment dates.
    #[test]
    fn prop_allocations_conserve_amount(
        amount in prop_oneof![-100_000_000i64..-1, 1i64..100_000_000],
        count in 1u32..=36,
        fee_mode in arb_fee_mode(),
        date in arb_date(),
        closing in arb_day(),
        payment in arb_day(),
    ) {
        let (card, rules) = card_with_rule(closing, payment);
        let tx = Transaction::new(date, Money::from_minor(amount))
            .on_card(card.id)
            .installments(count, fee_mode);

        let allocations = build_allocations(&[card.clone()], &rules, &[tx.clone()]).unwrap();

        prop_assert_eq!(allocations.len(), count as usize);
        let principal: Money = allocations.iter().map(|a| a.principal_part).sum();
        prop_assert_eq!(principal, Money::from_minor(amount).abs());
        for pair in allocations.windows(2) {
            prop_assert!(pair[0].payment_date < pair[1].payment_date);
            prop_assert_eq!(pair[0].cycle.next(), pair[1].cycle);
        }
        prop_assert!(allocations.iter().all(|a| !a.fee_part.is_negative()));

        prop_assert_eq!(build_allocations(&[card], &rules, &[tx]).unwrap(), allocations);
    }

    /// The event window always has `past + future + 1` events per active card,
    /// in payment date order, and recomputing gives the same result.
    #[test]
    fn prop_event_window_cardinality(
        past in 0u32..6,
        future in 0u32..6,
        today in arb_date(),
        closing in arb_day(),
        payment in arb_day(),
        tx_dates in proptest::collection::vec(arb_date(), 0..8),
    ) {
        let (card, rules) = card_with_rule(closing, payment);
        let txs: Vec<Transaction> = tx_dates
            .into_iter()
            .map(|d| {
                Transaction::new(d, Money::from_minor(10_000))
                    .on_card(card.id)
                    .installments(2, FeeMode::Free)
            })
            .collect();
        let cards = vec![card];

        let events = payment_events(&cards, &rules, &txs, &[], past, future, today).unwrap();

        prop_assert_eq!(events.len(), (past + future + 1) as usize);
        for pair in events.windows(2) {
            prop_assert!(pair[0].payment_date <= pair[1].payment_date);
            prop_assert_eq!(pair[0].cycle.next(), pair[1].cycle);
        }
        for event in &events {
            prop_assert_eq!(event.expected, event.expected_principal + event.expected_fee);
        }

        let again = payment_events(&cards, &rules, &txs, &[], past, future, today).unwrap();
        prop_assert_eq!(events, again);
    }
}
