//! Account resolution and balance aggregation.
//!
//! Account-data rows select their accounts with a filter expression and
//! aggregate one balance figure per period. Accounts and balances arrive as
//! plain in-memory structures; how they were obtained is the caller's
//! concern.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::formula::{AccountRecord, FilterExpr};
use crate::template::DataSource;

/// Balance figures for one account in one period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceEntry {
    #[serde(default)]
    pub opening: f64,
    #[serde(default)]
    pub movement: f64,
    #[serde(default)]
    pub closing: f64,
}

impl BalanceEntry {
    /// Returns the figure selected by a data source.
    pub fn figure(&self, source: DataSource) -> f64 {
        match source {
            DataSource::OpeningBalance => self.opening,
            DataSource::ClosingBalance => self.closing,
            DataSource::PeriodMovement => self.movement,
        }
    }
}

/// Account name to per-period balance entries.
pub type AccountBalances = HashMap<String, Vec<BalanceEntry>>;

/// Resolves filter expressions against a set of account records.
#[derive(Debug, Default)]
pub struct AccountResolver {
    accounts: Vec<AccountRecord>,
}

impl AccountResolver {
    /// Creates a resolver over the given account records.
    pub fn new(accounts: Vec<AccountRecord>) -> Self {
        Self { accounts }
    }

    /// Names of enabled accounts matching the filter, sorted ascending.
    pub fn matching_accounts(&self, filter: &FilterExpr) -> Vec<String> {
        let mut names: Vec<String> = self
            .accounts
            .iter()
            .filter(|account| !is_disabled(account))
            .filter(|account| filter.matches(account))
            .filter_map(account_name)
            .collect();
        names.sort_unstable();
        names
    }

    /// Sums the requested balance figure across matching accounts, one
    /// total per period. Accounts without balance data contribute nothing;
    /// a filter matching no accounts yields all zeros.
    pub fn period_totals(
        &self,
        filter: &FilterExpr,
        balances: &AccountBalances,
        source: DataSource,
        period_count: usize,
    ) -> Vec<f64> {
        let mut totals = vec![0.0; period_count];
        for name in self.matching_accounts(filter) {
            let Some(entries) = balances.get(&name) else {
                continue;
            };
            for (idx, total) in totals.iter_mut().enumerate() {
                if let Some(entry) = entries.get(idx) {
                    *total += entry.figure(source);
                }
            }
        }
        totals
    }
}

fn account_name(record: &AccountRecord) -> Option<String> {
    record
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn is_disabled(record: &AccountRecord) -> bool {
    match record.get("disabled") {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        _ => false,
    }
}
