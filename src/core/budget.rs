use serde::{Deserialize, Serialize};

use super::types::{Debt, Settings, lenient_amount, lenient_text, non_negative};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IncomeSource {
    #[serde(deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(deserialize_with = "lenient_amount")]
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Bill {
    #[serde(deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(deserialize_with = "lenient_amount")]
    pub amount: f64,
}

/// A monthly spending envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Envelope {
    #[serde(deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(deserialize_with = "lenient_amount")]
    pub budget: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub spent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SavingsGoal {
    #[serde(deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(deserialize_with = "lenient_amount")]
    pub target: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub current: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeBalance {
    pub name: String,
    pub budget: f64,
    pub spent: f64,
    pub left: f64,
    pub used_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub name: String,
    pub target: f64,
    pub current: f64,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_income: f64,
    pub total_bills: f64,
    pub total_envelope_budget: f64,
    pub total_envelope_spent: f64,
    pub total_debt_balance: f64,
    pub total_debt_minimums: f64,
    pub extra_payment: f64,
    /// Negative when more is allocated than comes in.
    pub left_to_assign: f64,
    pub savings_target: f64,
    pub savings_current: f64,
    pub savings_progress_pct: f64,
}

pub fn envelope_balances(envelopes: &[Envelope]) -> Vec<EnvelopeBalance> {
    envelopes
        .iter()
        .map(|env| EnvelopeBalance {
            name: env.name.clone(),
            budget: env.budget,
            spent: env.spent,
            left: (env.budget - env.spent).max(0.0),
            used_pct: capped_pct(env.spent, env.budget),
        })
        .collect()
}

pub fn goal_progress(goals: &[SavingsGoal]) -> Vec<GoalProgress> {
    goals
        .iter()
        .map(|goal| GoalProgress {
            name: goal.name.clone(),
            target: goal.target,
            current: goal.current,
            pct: capped_pct(goal.current, goal.target),
        })
        .collect()
}

/// Progress across all goals combined, capped at 100.
pub fn savings_progress_pct(goals: &[SavingsGoal]) -> f64 {
    let target: f64 = goals.iter().map(|g| g.target).sum();
    let current: f64 = goals.iter().map(|g| g.current).sum();
    capped_pct(current, target)
}

pub fn build_dashboard(
    income: &[IncomeSource],
    bills: &[Bill],
    envelopes: &[Envelope],
    debts: &[Debt],
    goals: &[SavingsGoal],
    settings: &Settings,
) -> Dashboard {
    let total_income: f64 = income.iter().map(|i| i.amount).sum();
    let total_bills: f64 = bills.iter().map(|b| b.amount).sum();
    let total_envelope_budget: f64 = envelopes.iter().map(|e| e.budget).sum();
    let total_envelope_spent: f64 = envelopes.iter().map(|e| e.spent).sum();

    let open_debts = debts.iter().filter(|d| non_negative(d.balance) > 0.0);
    let (total_debt_balance, total_debt_minimums) = open_debts
        .fold((0.0_f64, 0.0_f64), |(balance, minimums), d| {
            (balance + d.balance, minimums + non_negative(d.minimum))
        });

    let extra_payment = non_negative(settings.extra_payment);
    let left_to_assign =
        total_income - total_bills - total_envelope_budget - total_debt_minimums - extra_payment;

    Dashboard {
        total_income,
        total_bills,
        total_envelope_budget,
        total_envelope_spent,
        total_debt_balance,
        total_debt_minimums,
        extra_payment,
        left_to_assign,
        savings_target: goals.iter().map(|g| g.target).sum(),
        savings_current: goals.iter().map(|g| g.current).sum(),
        savings_progress_pct: savings_progress_pct(goals),
    }
}

fn capped_pct(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        (part / whole * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}
