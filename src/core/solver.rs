use serde::Serialize;

use super::engine::{MAX_MONTHS, simulate};
use super::types::{Debt, PayoffProjection, PayoffResult, Strategy};

pub const MAX_SOLVE_ITERATIONS: u32 = 200;
pub const MIN_SOLVE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
pub struct ExtraPaymentSolveConfig {
    pub target_months: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for ExtraPaymentSolveConfig {
    fn default() -> Self {
        Self {
            target_months: 36,
            search_min: 0.0,
            search_max: 10_000.0,
            tolerance: 0.5,
            max_iterations: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraPaymentSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate: f64,
    pub months: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraPaymentSolveResult {
    pub strategy: Strategy,
    pub target_months: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_extra_payment: Option<f64>,
    pub projection: Option<PayoffProjection>,
    pub iterations: Vec<ExtraPaymentSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

/// Finds the smallest extra monthly payment that clears every debt within
/// `target_months`, assuming more extra never takes longer.
pub fn solve_extra_payment(
    debts: &[Debt],
    strategy: Strategy,
    config: ExtraPaymentSolveConfig,
) -> Result<ExtraPaymentSolveResult, String> {
    validate_config(config)?;

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let mut solved_value = None;
    let mut converged = false;
    let feasible;
    let message;

    let low_eval = simulate(debts, strategy, config.search_min);
    if low_eval == PayoffResult::NothingToSimulate {
        solved_value = Some(config.search_min);
        converged = true;
        feasible = true;
        message = "No debts with a balance; nothing to pay off.".to_string();
    } else if meets_target(low_eval, config.target_months) {
        solved_value = Some(config.search_min);
        converged = true;
        feasible = true;
        message = "Already meets target at lower extra payment bound.".to_string();
    } else if !meets_target(
        simulate(debts, strategy, config.search_max),
        config.target_months,
    ) {
        feasible = false;
        message = "No feasible extra payment found within the search bounds.".to_string();
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let eval = simulate(debts, strategy, mid);
            iterations.push(ExtraPaymentSolveIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate: mid,
                months: eval.months(),
            });

            if meets_target(eval, config.target_months) {
                hi = mid;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                break;
            }
        }
        solved_value = Some(hi);
        feasible = true;
        message = if converged {
            "Solved required extra payment.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate."
                .to_string()
        };
    }

    let projection = solved_value.and_then(|value| simulate(debts, strategy, value).projection());
    tracing::debug!(
        target_months = config.target_months,
        solved = ?solved_value,
        iterations = iterations.len(),
        feasible,
        "extra payment solve finished"
    );

    Ok(ExtraPaymentSolveResult {
        strategy,
        target_months: config.target_months,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_extra_payment: solved_value,
        projection,
        iterations,
        converged,
        feasible,
        message,
    })
}

fn meets_target(result: PayoffResult, target_months: u32) -> bool {
    result.months().is_some_and(|months| months <= target_months)
}

fn validate_config(config: ExtraPaymentSolveConfig) -> Result<(), String> {
    if config.target_months == 0 || config.target_months > MAX_MONTHS {
        return Err(format!("target_months must be between 1 and {MAX_MONTHS}"));
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err("search bounds must be finite".to_string());
    }
    if config.search_min < 0.0 {
        return Err("search_min must be >= 0".to_string());
    }
    if config.search_max <= config.search_min {
        return Err("search_max must be greater than search_min".to_string());
    }
    if !config.tolerance.is_finite() || config.tolerance < MIN_SOLVE_TOLERANCE {
        return Err(format!("tolerance must be >= {MIN_SOLVE_TOLERANCE}"));
    }
    if config.max_iterations == 0 || config.max_iterations > MAX_SOLVE_ITERATIONS {
        return Err(format!(
            "max_iterations must be between 1 and {MAX_SOLVE_ITERATIONS}"
        ));
    }
    Ok(())
}
