use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::budget::{Bill, Dashboard, Envelope, IncomeSource, SavingsGoal, build_dashboard};
use super::types::{Debt, Settings};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read budget document {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid budget document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Everything the budget tracks. Missing sections fall back to empty defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BudgetDocument {
    pub income: Vec<IncomeSource>,
    pub bills: Vec<Bill>,
    pub envelopes: Vec<Envelope>,
    pub debts: Vec<Debt>,
    pub goals: Vec<SavingsGoal>,
    pub settings: Settings,
}

impl BudgetDocument {
    pub fn from_json_str(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let json = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = Self::from_json_str(&json)?;
        tracing::debug!(
            path = %path.display(),
            debts = document.debts.len(),
            envelopes = document.envelopes.len(),
            goals = document.goals.len(),
            "loaded budget document"
        );
        Ok(document)
    }

    pub fn dashboard(&self) -> Dashboard {
        build_dashboard(
            &self.income,
            &self.bills,
            &self.envelopes,
            &self.debts,
            &self.goals,
            &self.settings,
        )
    }
}
