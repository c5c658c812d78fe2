mod budget;
mod document;
mod engine;
mod solver;
mod types;

pub use budget::{
    Bill, Dashboard, Envelope, EnvelopeBalance, GoalProgress, IncomeSource, SavingsGoal,
    build_dashboard, envelope_balances, goal_progress, savings_progress_pct,
};
pub use document::{BudgetDocument, DocumentError};
pub use engine::{BALANCE_EPSILON, MAX_MONTHS, run_payoff_timeline, simulate};
pub use solver::{
    ExtraPaymentSolveConfig, ExtraPaymentSolveIteration, ExtraPaymentSolveResult,
    MAX_SOLVE_ITERATIONS, MIN_SOLVE_TOLERANCE, solve_extra_payment,
};
pub use types::{
    Debt, DebtPayoff, ImpossibleReason, PayoffMonth, PayoffProjection, PayoffResult,
    PayoffTimeline, Settings, Strategy, coerce_amount, non_negative,
};
pub(crate) use types::{lenient_optional_amount, lenient_optional_count};
