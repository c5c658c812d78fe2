use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Snowball,
    Avalanche,
}

impl Strategy {
    /// Anything other than `avalanche` falls back to snowball.
    pub fn from_setting(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("avalanche") {
            Strategy::Avalanche
        } else {
            Strategy::Snowball
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Snowball => "snowball",
            Strategy::Avalanche => "avalanche",
        }
    }
}

impl<'de> Deserialize<'de> for Strategy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value
            .as_str()
            .map(Strategy::from_setting)
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Debt {
    #[serde(deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(deserialize_with = "lenient_amount")]
    pub balance: f64,
    #[serde(deserialize_with = "lenient_amount")]
    pub minimum: f64,
    /// Annual percentage rate, `19.99` meaning 19.99% per year.
    #[serde(deserialize_with = "lenient_amount")]
    pub rate: f64,
}

impl Debt {
    pub fn new(name: impl Into<String>, balance: f64, minimum: f64, rate: f64) -> Self {
        Self {
            name: name.into(),
            balance,
            minimum,
            rate,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub strategy: Strategy,
    #[serde(deserialize_with = "lenient_amount")]
    pub extra_payment: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoffProjection {
    pub months: u32,
    pub years: f64,
    pub total_interest: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ImpossibleReason {
    ZeroPayments,
    PaymentsTooSmall,
    ExceedsHorizon,
}

impl ImpossibleReason {
    pub fn message(self) -> &'static str {
        match self {
            ImpossibleReason::ZeroPayments => {
                "Monthly payments are zero, so these debts can never be paid off."
            }
            ImpossibleReason::PaymentsTooSmall => {
                "Payments are too small to ever pay off these debts."
            }
            ImpossibleReason::ExceedsHorizon => "Payoff would take more than 50 years.",
        }
    }
}

impl fmt::Display for ImpossibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PayoffResult {
    /// No debt has a positive balance.
    NothingToSimulate,
    PaidOff(PayoffProjection),
    Impossible(ImpossibleReason),
}

impl PayoffResult {
    pub fn projection(&self) -> Option<PayoffProjection> {
        match self {
            PayoffResult::PaidOff(projection) => Some(*projection),
            _ => None,
        }
    }

    pub fn months(&self) -> Option<u32> {
        self.projection().map(|p| p.months)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoffMonth {
    pub month: u32,
    pub interest: f64,
    pub paid: f64,
    pub remaining_balance: f64,
    pub cleared: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtPayoff {
    pub name: String,
    pub month: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayoffTimeline {
    pub result: PayoffResult,
    pub months: Vec<PayoffMonth>,
    pub payoff_order: Vec<DebtPayoff>,
}

/// Clamps to a finite, non-negative amount.
pub fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Numbers pass through, numeric strings are parsed, everything else is 0.
pub fn coerce_amount(value: &Value) -> f64 {
    let raw = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if raw.is_finite() { raw } else { 0.0 }
}

pub(crate) fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_amount(&value))
}

pub(crate) fn lenient_optional_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => Some(coerce_amount(&other)),
    })
}

/// Whole-number counts such as month targets. Values that are not a
/// non-negative integer fitting in `u32` are treated as absent.
pub(crate) fn lenient_optional_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(_) | Value::String(_) => {
            let count = coerce_amount(&value);
            (count >= 0.0 && count.fract() == 0.0 && count <= f64::from(u32::MAX))
                .then_some(count as u32)
        }
        _ => None,
    })
}

pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}
