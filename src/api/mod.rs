use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use axum::{
    Router,
    extract::{Json, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::core::{
    BudgetDocument, Dashboard, Debt, DebtPayoff, DocumentError, EnvelopeBalance,
    ExtraPaymentSolveConfig, ExtraPaymentSolveResult, GoalProgress, PayoffMonth,
    PayoffProjection, PayoffResult, Strategy, envelope_balances, goal_progress,
    lenient_optional_amount, lenient_optional_count, non_negative, run_payoff_timeline, simulate,
    solve_extra_payment,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliStrategy {
    Snowball,
    Avalanche,
}

impl From<CliStrategy> for Strategy {
    fn from(value: CliStrategy) -> Self {
        match value {
            CliStrategy::Snowball => Strategy::Snowball,
            CliStrategy::Avalanche => Strategy::Avalanche,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "debtplan",
    about = "Budget tracker with a snowball/avalanche debt payoff simulator"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API over HTTP
    Serve(ServeArgs),
    /// Project when the debts in a budget document are paid off
    Payoff(PayoffArgs),
    /// Dashboard totals, envelope balances, goal progress and payoff projection
    Summary(DocumentArgs),
    /// Find the extra monthly payment needed to be debt-free by a target month
    SolveExtra(SolveArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[derive(Args, Debug)]
struct DocumentArgs {
    #[arg(long, help = "Budget document JSON file")]
    file: PathBuf,
}

#[derive(Args, Debug)]
struct PayoffArgs {
    #[command(flatten)]
    document: DocumentArgs,
    #[arg(long, value_enum, help = "Overrides the document's strategy")]
    strategy: Option<CliStrategy>,
    #[arg(long, help = "Overrides the document's extra monthly payment")]
    extra_payment: Option<f64>,
    #[arg(long, help = "Include the month-by-month payoff timeline")]
    timeline: bool,
}

#[derive(Args, Debug)]
struct SolveArgs {
    #[command(flatten)]
    document: DocumentArgs,
    #[arg(long, value_enum, help = "Overrides the document's strategy")]
    strategy: Option<CliStrategy>,
    #[arg(long, help = "Months within which every debt should be paid off")]
    target_months: u32,
    #[arg(long, help = "Lowest extra payment to consider (default 0)")]
    search_min: Option<f64>,
    #[arg(long, help = "Highest extra payment to consider (default 10000)")]
    search_max: Option<f64>,
    #[arg(long, help = "Stop once the bracket is this narrow (default 0.5)")]
    tolerance: Option<f64>,
    #[arg(long, help = "Bisection iteration cap (default 40)")]
    max_iterations: Option<u32>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid solver settings: {0}")]
    Solve(String),
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PayoffPayload {
    debts: Vec<Debt>,
    strategy: Strategy,
    #[serde(deserialize_with = "lenient_optional_amount")]
    extra_payment: Option<f64>,
    timeline: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    debts: Vec<Debt>,
    strategy: Strategy,
    #[serde(deserialize_with = "lenient_optional_count")]
    target_months: Option<u32>,
    #[serde(deserialize_with = "lenient_optional_amount")]
    search_min: Option<f64>,
    #[serde(deserialize_with = "lenient_optional_amount")]
    search_max: Option<f64>,
    #[serde(deserialize_with = "lenient_optional_amount")]
    tolerance: Option<f64>,
    #[serde(deserialize_with = "lenient_optional_count")]
    max_iterations: Option<u32>,
}

#[derive(Debug, Clone)]
struct PayoffRequest {
    debts: Vec<Debt>,
    strategy: Strategy,
    extra_payment: f64,
    include_timeline: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImpossibleBody {
    impossible: bool,
    reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum PayoffResultBody {
    PaidOff(PayoffProjection),
    Impossible(ImpossibleBody),
}

impl PayoffResultBody {
    fn from_result(result: PayoffResult) -> Option<Self> {
        match result {
            PayoffResult::NothingToSimulate => None,
            PayoffResult::PaidOff(projection) => Some(PayoffResultBody::PaidOff(projection)),
            PayoffResult::Impossible(reason) => Some(PayoffResultBody::Impossible(ImpossibleBody {
                impossible: true,
                reason: reason.to_string(),
            })),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PayoffResponse {
    strategy: Strategy,
    extra_payment: f64,
    /// `null` when there is no debt to simulate.
    result: Option<PayoffResultBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeline: Option<Vec<PayoffMonth>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payoff_order: Option<Vec<DebtPayoff>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    dashboard: Dashboard,
    envelopes: Vec<EnvelopeBalance>,
    goals: Vec<GoalProgress>,
    payoff: PayoffResponse,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Serve(args) => {
            run_http_server(SocketAddr::new(args.bind, args.port)).await?;
        }
        Command::Payoff(args) => {
            let document = load_document(&args.document.file)?;
            let request = payoff_request_from_cli(&document, &args);
            print_json(&build_payoff_response(&request))?;
        }
        Command::Summary(args) => {
            let document = load_document(&args.file)?;
            print_json(&build_summary_response(&document))?;
        }
        Command::SolveExtra(args) => {
            let document = load_document(&args.document.file)?;
            let strategy = args
                .strategy
                .map(Strategy::from)
                .unwrap_or(document.settings.strategy);
            let config = solve_config_from_cli(&args);
            let result =
                solve_extra_payment(&document.debts, strategy, config).map_err(CliError::Solve)?;
            print_json(&result)?;
        }
    }
    Ok(())
}

pub async fn run_http_server(addr: SocketAddr) -> std::io::Result<()> {
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/payoff", post(payoff_handler))
        .route("/api/summary", post(summary_handler))
        .route("/api/solve-extra", post(solve_extra_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "debt payoff API listening");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn payoff_handler(payload: Result<Json<PayoffPayload>, JsonRejection>) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    let request = payoff_request_from_payload(payload);
    tracing::debug!(
        debts = request.debts.len(),
        strategy = request.strategy.as_str(),
        extra_payment = request.extra_payment,
        "payoff request"
    );
    json_response(StatusCode::OK, build_payoff_response(&request))
}

async fn summary_handler(document: Result<Json<BudgetDocument>, JsonRejection>) -> Response {
    let Json(document) = match document {
        Ok(document) => document,
        Err(rejection) => return rejection_response(rejection),
    };
    tracing::debug!(debts = document.debts.len(), "summary request");
    json_response(StatusCode::OK, build_summary_response(&document))
}

async fn solve_extra_handler(payload: Result<Json<SolvePayload>, JsonRejection>) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    match solve_from_payload(payload) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn rejection_response(rejection: JsonRejection) -> Response {
    tracing::debug!(error = %rejection.body_text(), "rejected request body");
    error_response(StatusCode::BAD_REQUEST, &rejection.body_text())
}

fn load_document(path: &Path) -> Result<BudgetDocument, DocumentError> {
    BudgetDocument::load(path).inspect_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "could not load budget document");
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
fn payoff_request_from_json(json: &str) -> Result<PayoffRequest, String> {
    let payload = serde_json::from_str::<PayoffPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    Ok(payoff_request_from_payload(payload))
}

fn payoff_request_from_payload(payload: PayoffPayload) -> PayoffRequest {
    PayoffRequest {
        debts: payload.debts,
        strategy: payload.strategy,
        extra_payment: non_negative(payload.extra_payment.unwrap_or(0.0)),
        include_timeline: payload.timeline,
    }
}

fn payoff_request_from_cli(document: &BudgetDocument, args: &PayoffArgs) -> PayoffRequest {
    let mut request = PayoffRequest {
        debts: document.debts.clone(),
        strategy: document.settings.strategy,
        extra_payment: non_negative(document.settings.extra_payment),
        include_timeline: args.timeline,
    };

    if let Some(v) = args.strategy {
        request.strategy = v.into();
    }
    if let Some(v) = args.extra_payment {
        request.extra_payment = non_negative(v);
    }

    request
}

fn solve_config_from_cli(args: &SolveArgs) -> ExtraPaymentSolveConfig {
    let mut config = ExtraPaymentSolveConfig {
        target_months: args.target_months,
        ..ExtraPaymentSolveConfig::default()
    };

    if let Some(v) = args.search_min {
        config.search_min = v;
    }
    if let Some(v) = args.search_max {
        config.search_max = v;
    }
    if let Some(v) = args.tolerance {
        config.tolerance = v;
    }
    if let Some(v) = args.max_iterations {
        config.max_iterations = v;
    }

    config
}

fn solve_from_payload(payload: SolvePayload) -> Result<ExtraPaymentSolveResult, String> {
    let mut config = ExtraPaymentSolveConfig::default();

    if let Some(v) = payload.target_months {
        config.target_months = v;
    }
    if let Some(v) = payload.search_min {
        config.search_min = v;
    }
    if let Some(v) = payload.search_max {
        config.search_max = v;
    }
    if let Some(v) = payload.tolerance {
        config.tolerance = v;
    }
    if let Some(v) = payload.max_iterations {
        config.max_iterations = v;
    }

    solve_extra_payment(&payload.debts, payload.strategy, config)
}

fn build_payoff_response(request: &PayoffRequest) -> PayoffResponse {
    let (result, timeline, payoff_order) = if request.include_timeline {
        let timeline = run_payoff_timeline(&request.debts, request.strategy, request.extra_payment);
        (
            timeline.result,
            Some(timeline.months),
            Some(timeline.payoff_order),
        )
    } else {
        (
            simulate(&request.debts, request.strategy, request.extra_payment),
            None,
            None,
        )
    };

    PayoffResponse {
        strategy: request.strategy,
        extra_payment: request.extra_payment,
        result: PayoffResultBody::from_result(result),
        timeline,
        payoff_order,
    }
}

fn build_summary_response(document: &BudgetDocument) -> SummaryResponse {
    let request = PayoffRequest {
        debts: document.debts.clone(),
        strategy: document.settings.strategy,
        extra_payment: non_negative(document.settings.extra_payment),
        include_timeline: false,
    };

    SummaryResponse {
        dashboard: document.dashboard(),
        envelopes: envelope_balances(&document.envelopes),
        goals: goal_progress(&document.goals),
        payoff: build_payoff_response(&request),
    }
}
