use std::cmp::Ordering;

use super::types::{
    Debt, DebtPayoff, ImpossibleReason, PayoffMonth, PayoffProjection, PayoffResult,
    PayoffTimeline, Strategy, non_negative,
};

/// Hard simulation horizon: 50 years.
pub const MAX_MONTHS: u32 = 600;
/// Remaining balance at or below this counts as paid off.
pub const BALANCE_EPSILON: f64 = 0.01;
const STALL_THRESHOLD: f64 = 1e-9;

#[derive(Debug, Clone)]
struct WorkingDebt {
    index: usize,
    name: String,
    balance: f64,
    minimum: f64,
    rate: f64,
    cleared: bool,
}

impl WorkingDebt {
    fn monthly_rate(&self) -> f64 {
        self.rate / 100.0 / 12.0
    }
}

#[derive(Debug, Clone, Copy)]
struct MonthOutcome {
    interest: f64,
    paid: f64,
}

type PriorityOrder = fn(&WorkingDebt, &WorkingDebt) -> Ordering;

pub fn simulate(debts: &[Debt], strategy: Strategy, extra_payment: f64) -> PayoffResult {
    run_simulation(debts, strategy, extra_payment, None)
}

pub fn run_payoff_timeline(
    debts: &[Debt],
    strategy: Strategy,
    extra_payment: f64,
) -> PayoffTimeline {
    let mut months = Vec::new();
    let result = run_simulation(debts, strategy, extra_payment, Some(&mut months));
    let payoff_order = months
        .iter()
        .flat_map(|row| {
            row.cleared.iter().map(|name| DebtPayoff {
                name: name.clone(),
                month: row.month,
            })
        })
        .collect();

    PayoffTimeline {
        result,
        months,
        payoff_order,
    }
}

fn run_simulation(
    debts: &[Debt],
    strategy: Strategy,
    extra_payment: f64,
    mut trace: Option<&mut Vec<PayoffMonth>>,
) -> PayoffResult {
    let mut working = snapshot_debts(debts);
    if working.is_empty() {
        tracing::debug!("no debts with a positive balance, nothing to simulate");
        return PayoffResult::NothingToSimulate;
    }

    let extra_payment = non_negative(extra_payment);
    let monthly_min_total: f64 = working.iter().map(|d| d.minimum).sum();
    let monthly_payment_total = monthly_min_total + extra_payment;
    if monthly_payment_total <= 0.0 {
        return impossible(ImpossibleReason::ZeroPayments, 0);
    }

    let priority = priority_order(strategy);
    let mut total_interest = 0.0;
    let mut months = 0_u32;

    while months < MAX_MONTHS {
        if remaining_balance(&working) <= BALANCE_EPSILON {
            return paid_off(months, total_interest, strategy);
        }

        let outcome = simulate_month(&mut working, priority, monthly_payment_total);
        total_interest += outcome.interest;
        months += 1;

        let remaining = remaining_balance(&working);
        if let Some(rows) = trace.as_deref_mut() {
            rows.push(PayoffMonth {
                month: months,
                interest: outcome.interest,
                paid: outcome.paid,
                remaining_balance: remaining,
                cleared: mark_cleared(&mut working),
            });
        }

        if remaining > BALANCE_EPSILON && outcome.paid <= STALL_THRESHOLD {
            return impossible(ImpossibleReason::PaymentsTooSmall, months);
        }
    }

    if remaining_balance(&working) <= BALANCE_EPSILON {
        paid_off(months, total_interest, strategy)
    } else {
        impossible(ImpossibleReason::ExceedsHorizon, months)
    }
}

fn snapshot_debts(debts: &[Debt]) -> Vec<WorkingDebt> {
    debts
        .iter()
        .enumerate()
        .filter_map(|(index, debt)| {
            let balance = non_negative(debt.balance);
            (balance > 0.0).then(|| WorkingDebt {
                index,
                name: debt.name.clone(),
                balance,
                minimum: non_negative(debt.minimum),
                rate: non_negative(debt.rate),
                cleared: false,
            })
        })
        .collect()
}

fn simulate_month(
    working: &mut [WorkingDebt],
    priority: PriorityOrder,
    monthly_payment_total: f64,
) -> MonthOutcome {
    let interest = accrue_interest(working);

    // Balances moved, so priority can shift month to month.
    working.sort_by(priority);

    let mut pool = monthly_payment_total;
    apply_minimum_payments(working, &mut pool);
    apply_extra_payments(working, &mut pool);

    MonthOutcome {
        interest,
        paid: monthly_payment_total - pool,
    }
}

fn accrue_interest(working: &mut [WorkingDebt]) -> f64 {
    let mut interest = 0.0;
    for debt in working.iter_mut() {
        if debt.balance > 0.0 && debt.rate > 0.0 {
            let accrued = debt.balance * debt.monthly_rate();
            debt.balance += accrued;
            interest += accrued;
        }
    }
    interest
}

fn apply_minimum_payments(working: &mut [WorkingDebt], pool: &mut f64) {
    for debt in working.iter_mut() {
        let payment = debt.minimum.min(debt.balance).min(*pool).max(0.0);
        debt.balance -= payment;
        *pool -= payment;
    }
}

fn apply_extra_payments(working: &mut [WorkingDebt], pool: &mut f64) {
    for debt in working.iter_mut() {
        if *pool <= 0.0 {
            break;
        }
        let payment = debt.balance.min(*pool).max(0.0);
        debt.balance -= payment;
        *pool -= payment;
    }
}

fn remaining_balance(working: &[WorkingDebt]) -> f64 {
    working.iter().map(|d| d.balance.max(0.0)).sum()
}

/// Names of debts cleared this month, in input order.
fn mark_cleared(working: &mut [WorkingDebt]) -> Vec<String> {
    let mut newly_cleared = working
        .iter_mut()
        .filter(|d| !d.cleared && d.balance <= BALANCE_EPSILON)
        .map(|d| {
            d.cleared = true;
            (d.index, d.name.clone())
        })
        .collect::<Vec<_>>();
    newly_cleared.sort_by_key(|(index, _)| *index);
    newly_cleared.into_iter().map(|(_, name)| name).collect()
}

fn priority_order(strategy: Strategy) -> PriorityOrder {
    match strategy {
        Strategy::Snowball => snowball_order,
        Strategy::Avalanche => avalanche_order,
    }
}

// Ties fall back to input position so the order never depends on last month's sort.
fn snowball_order(a: &WorkingDebt, b: &WorkingDebt) -> Ordering {
    a.balance
        .total_cmp(&b.balance)
        .then_with(|| a.index.cmp(&b.index))
}

fn avalanche_order(a: &WorkingDebt, b: &WorkingDebt) -> Ordering {
    b.rate
        .total_cmp(&a.rate)
        .then_with(|| a.index.cmp(&b.index))
}

fn paid_off(months: u32, total_interest: f64, strategy: Strategy) -> PayoffResult {
    tracing::debug!(
        months,
        total_interest,
        strategy = strategy.as_str(),
        "payoff simulation finished"
    );
    PayoffResult::PaidOff(PayoffProjection {
        months,
        years: months as f64 / 12.0,
        total_interest,
    })
}

fn impossible(reason: ImpossibleReason, months: u32) -> PayoffResult {
    tracing::debug!(months, reason = %reason, "payoff simulation cannot finish");
    PayoffResult::Impossible(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn expect_paid_off(result: PayoffResult) -> PayoffProjection {
        match result {
            PayoffResult::PaidOff(projection) => projection,
            other => panic!("expected a payoff projection, got {other:?}"),
        }
    }

    fn sample_debts() -> Vec<Debt> {
        vec![
            Debt::new("Store card", 1_000.0, 50.0, 5.0),
            Debt::new("Credit card", 3_000.0, 50.0, 20.0),
        ]
    }

    #[test]
    fn single_interest_free_debt_pays_off_in_twelve_months() {
        let debts = vec![Debt::new("Loan", 1_200.0, 100.0, 0.0)];
        let projection = expect_paid_off(simulate(&debts, Strategy::Snowball, 0.0));
        assert_eq!(projection.months, 12);
        assert_approx(projection.years, 1.0);
        assert_approx(projection.total_interest, 0.0);
    }

    #[test]
    fn zero_minimum_and_zero_extra_is_impossible() {
        let debts = vec![Debt::new("Loan", 1_200.0, 0.0, 0.0)];
        assert_eq!(
            simulate(&debts, Strategy::Snowball, 0.0),
            PayoffResult::Impossible(ImpossibleReason::ZeroPayments)
        );
    }

    #[test]
    fn snowball_redirects_freed_minimum_to_next_debt() {
        let debts = vec![
            Debt::new("A", 100.0, 20.0, 0.0),
            Debt::new("B", 500.0, 20.0, 0.0),
        ];
        // A clears after 5 months at 20; B has 400 left and then takes 40 a month.
        let projection = expect_paid_off(simulate(&debts, Strategy::Snowball, 0.0));
        assert_eq!(projection.months, 15);
        assert_approx(projection.years, 1.25);
        assert_approx(projection.total_interest, 0.0);

        let timeline = run_payoff_timeline(&debts, Strategy::Snowball, 0.0);
        assert_eq!(
            timeline.payoff_order,
            vec![
                DebtPayoff {
                    name: "A".to_string(),
                    month: 5
                },
                DebtPayoff {
                    name: "B".to_string(),
                    month: 15
                },
            ]
        );
        assert_approx(timeline.months[5].paid, 40.0);
        assert_approx(timeline.months[5].remaining_balance, 360.0);
    }

    #[test]
    fn runaway_interest_exceeds_horizon() {
        let debts = vec![Debt::new("Mortgage", 1_000_000.0, 1.0, 30.0)];
        assert_eq!(
            simulate(&debts, Strategy::Snowball, 0.0),
            PayoffResult::Impossible(ImpossibleReason::ExceedsHorizon)
        );
    }

    #[test]
    fn negligible_payment_capacity_stalls() {
        let debts = vec![Debt::new("Loan", 500.0, 0.0, 0.0)];
        assert_eq!(
            simulate(&debts, Strategy::Avalanche, 1e-12),
            PayoffResult::Impossible(ImpossibleReason::PaymentsTooSmall)
        );
    }

    #[test]
    fn only_positive_balances_are_simulated() {
        let debts = vec![
            Debt::new("Paid", 0.0, 50.0, 10.0),
            Debt::new("Overpaid", -20.0, 50.0, 10.0),
            Debt::new("Broken", f64::NAN, 50.0, 10.0),
        ];
        assert_eq!(
            simulate(&debts, Strategy::Snowball, 100.0),
            PayoffResult::NothingToSimulate
        );
        assert_eq!(
            simulate(&[], Strategy::Avalanche, 0.0),
            PayoffResult::NothingToSimulate
        );
    }

    #[test]
    fn paid_off_debts_do_not_contribute_minimums() {
        // The zero-balance debt's minimum is not part of the pool.
        let debts = vec![
            Debt::new("Done", 0.0, 500.0, 0.0),
            Debt::new("Open", 300.0, 0.0, 0.0),
        ];
        assert_eq!(
            simulate(&debts, Strategy::Snowball, 0.0),
            PayoffResult::Impossible(ImpossibleReason::ZeroPayments)
        );
    }

    #[test]
    fn negative_inputs_are_clamped_to_zero() {
        let debts = vec![Debt::new("Loan", 600.0, 100.0, -12.0)];
        let projection = expect_paid_off(simulate(&debts, Strategy::Snowball, -50.0));
        assert_eq!(projection.months, 6);
        assert_approx(projection.total_interest, 0.0);
    }

    #[test]
    fn interest_accrues_before_payment() {
        // 12% APR is 1% a month: 1000 -> 1010, then the full 1010 is paid.
        let debts = vec![Debt::new("Loan", 1_000.0, 0.0, 12.0)];
        let projection = expect_paid_off(simulate(&debts, Strategy::Snowball, 1_010.0));
        assert_eq!(projection.months, 1);
        assert_approx(projection.total_interest, 10.0);
    }

    #[test]
    fn avalanche_targets_highest_rate_and_snowball_smallest_balance() {
        let debts = sample_debts();

        let snowball = run_payoff_timeline(&debts, Strategy::Snowball, 500.0);
        assert_eq!(snowball.payoff_order[0].name, "Store card");

        let avalanche = run_payoff_timeline(&debts, Strategy::Avalanche, 500.0);
        assert_eq!(avalanche.payoff_order[0].name, "Credit card");

        let snowball = expect_paid_off(snowball.result);
        let avalanche = expect_paid_off(avalanche.result);
        assert!(avalanche.total_interest <= snowball.total_interest + EPS);
    }

    #[test]
    fn avalanche_pays_less_interest_when_only_rates_differ() {
        let debts = vec![
            Debt::new("Low", 5_000.0, 100.0, 5.0),
            Debt::new("High", 5_000.0, 100.0, 25.0),
        ];
        let snowball = expect_paid_off(simulate(&debts, Strategy::Snowball, 200.0));
        let avalanche = expect_paid_off(simulate(&debts, Strategy::Avalanche, 200.0));
        assert!(
            avalanche.total_interest < snowball.total_interest,
            "avalanche {} vs snowball {}",
            avalanche.total_interest,
            snowball.total_interest
        );
    }

    #[test]
    fn equal_balances_break_ties_by_input_order() {
        let debts = vec![
            Debt::new("First", 500.0, 10.0, 0.0),
            Debt::new("Second", 500.0, 10.0, 0.0),
        ];
        let timeline = run_payoff_timeline(&debts, Strategy::Snowball, 100.0);
        let names = timeline
            .payoff_order
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["First", "Second"]);

        let reversed = debts.iter().rev().cloned().collect::<Vec<_>>();
        let timeline = run_payoff_timeline(&reversed, Strategy::Avalanche, 100.0);
        assert_eq!(timeline.payoff_order[0].name, "Second");
    }

    #[test]
    fn timeline_matches_simulate_and_accounts_for_every_month() {
        let debts = sample_debts();
        for strategy in [Strategy::Snowball, Strategy::Avalanche] {
            let timeline = run_payoff_timeline(&debts, strategy, 150.0);
            assert_eq!(timeline.result, simulate(&debts, strategy, 150.0));

            let projection = expect_paid_off(timeline.result);
            assert_eq!(timeline.months.len(), projection.months as usize);
            let interest: f64 = timeline.months.iter().map(|m| m.interest).sum();
            assert_approx(interest, projection.total_interest);
            assert_eq!(timeline.payoff_order.len(), debts.len());

            let last = timeline.months.last().expect("at least one month");
            assert!(last.remaining_balance <= BALANCE_EPSILON);
            for (idx, row) in timeline.months.iter().enumerate() {
                assert_eq!(row.month, idx as u32 + 1);
                assert!(row.paid >= 0.0);
            }
        }
    }

    #[test]
    fn timeline_records_stalled_month_before_giving_up() {
        let debts = vec![Debt::new("Loan", 500.0, 0.0, 0.0)];
        let timeline = run_payoff_timeline(&debts, Strategy::Snowball, 1e-12);
        assert_eq!(
            timeline.result,
            PayoffResult::Impossible(ImpossibleReason::PaymentsTooSmall)
        );
        assert_eq!(timeline.months.len(), 1);
        assert!(timeline.payoff_order.is_empty());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_zero_payment_capacity_is_always_impossible(
            balances in proptest::collection::vec(1u32..1_000_000, 1..6),
            rate_bp in 0u32..3_000
        ) {
            let debts = balances
                .iter()
                .enumerate()
                .map(|(i, b)| Debt::new(format!("debt-{i}"), *b as f64, 0.0, rate_bp as f64 / 100.0))
                .collect::<Vec<_>>();
            for strategy in [Strategy::Snowball, Strategy::Avalanche] {
                prop_assert_eq!(
                    simulate(&debts, strategy, 0.0),
                    PayoffResult::Impossible(ImpossibleReason::ZeroPayments)
                );
            }
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_more_extra_never_takes_longer_without_interest(
            debts in proptest::collection::vec((1u32..20_000, 0u32..400), 1..6),
            extra in 0u32..1_000,
            delta in 1u32..1_000,
            avalanche in proptest::bool::ANY
        ) {
            let debts = debts
                .iter()
                .enumerate()
                .map(|(i, (b, m))| Debt::new(format!("debt-{i}"), *b as f64, *m as f64, 0.0))
                .collect::<Vec<_>>();
            let strategy = if avalanche { Strategy::Avalanche } else { Strategy::Snowball };

            let low = simulate(&debts, strategy, extra as f64);
            let high = simulate(&debts, strategy, (extra + delta) as f64);
            match (low, high) {
                (PayoffResult::PaidOff(low), PayoffResult::PaidOff(high)) => {
                    prop_assert!(high.months <= low.months);
                }
                (PayoffResult::Impossible(_), _) => {}
                (low, high) => {
                    prop_assert!(false, "more extra payment made things worse: {low:?} -> {high:?}");
                }
            }
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_more_extra_never_takes_longer_for_single_debt_with_interest(
            balance in 100u32..50_000,
            minimum in 0u32..500,
            rate_bp in 0u32..3_000,
            extra in 0u32..1_000,
            delta in 1u32..1_000
        ) {
            let debts = vec![Debt::new("Loan", balance as f64, minimum as f64, rate_bp as f64 / 100.0)];
            let low = simulate(&debts, Strategy::Snowball, extra as f64);
            let high = simulate(&debts, Strategy::Snowball, (extra + delta) as f64);
            match (low, high) {
                (PayoffResult::PaidOff(low), PayoffResult::PaidOff(high)) => {
                    prop_assert!(high.months <= low.months);
                    prop_assert!(high.total_interest <= low.total_interest + EPS);
                }
                (PayoffResult::Impossible(_), _) => {}
                (low, high) => {
                    prop_assert!(false, "more extra payment made things worse: {low:?} -> {high:?}");
                }
            }
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_simulation_is_repeatable_and_leaves_inputs_untouched(
            debts in proptest::collection::vec((0u32..50_000, 0u32..800, 0u32..3_000), 0..6),
            extra in 0u32..2_000,
            avalanche in proptest::bool::ANY
        ) {
            let debts = debts
                .iter()
                .enumerate()
                .map(|(i, (b, m, r))| Debt::new(format!("debt-{i}"), *b as f64, *m as f64, *r as f64 / 100.0))
                .collect::<Vec<_>>();
            let before = debts.clone();
            let strategy = if avalanche { Strategy::Avalanche } else { Strategy::Snowball };

            let first = simulate(&debts, strategy, extra as f64);
            let second = simulate(&debts, strategy, extra as f64);
            prop_assert_eq!(first, second);
            prop_assert_eq!(&debts, &before);

            if let PayoffResult::PaidOff(projection) = first {
                prop_assert!(projection.months <= MAX_MONTHS);
                prop_assert!(projection.total_interest >= 0.0);
                prop_assert!(projection.total_interest.is_finite());
                prop_assert_eq!(projection.years.to_bits(), (projection.months as f64 / 12.0).to_bits());
            }
        }
    }
}
