//! Report computation over in-memory data.
//!
//! The engine takes a validated template plus period definitions and
//! produces one computed row per template row: account rows aggregate
//! balances selected by their filter expression, formula rows evaluate in
//! dependency order against the values accumulated so far, spacing rows
//! stay empty. The output is display-ready; persistence and data retrieval
//! are the caller's concern.

mod accounts;

pub use accounts::{AccountBalances, AccountResolver, BalanceEntry};

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EngineError;
use crate::formula::{FilterExpr, FormulaCalculator};
use crate::template::{DependencyResolver, ReportTemplate, RowType};

/// One reporting column: a key and a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

impl Period {
    /// Creates a period with the given key and date range.
    pub fn new(key: impl Into<String>, from_date: NaiveDate, to_date: NaiveDate) -> Self {
        Self {
            key: key.into(),
            label: None,
            from_date,
            to_date,
        }
    }

    /// Returns the label, falling back to the key.
    pub fn display(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }
}

/// Values below this magnitude count as zero for `hide_if_zero`.
const ZERO_TOLERANCE: f64 = 1e-9;

/// One computed report row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputedRow {
    pub reference_code: Option<String>,
    pub label: String,
    pub row_type: RowType,
    /// One value per period; empty for spacing rows.
    pub values: Vec<f64>,
    pub indentation_level: u32,
    pub bold_text: bool,
    pub italic_text: bool,
    pub is_statistical: bool,
    /// True when the row asked to be hidden and every value is zero.
    pub hidden: bool,
}

/// A fully computed report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputedReport {
    pub template_name: String,
    pub periods: Vec<Period>,
    pub rows: Vec<ComputedRow>,
}

/// Computes report values for a template over a set of periods.
pub struct ReportEngine<'a> {
    template: &'a ReportTemplate,
    periods: &'a [Period],
}

impl<'a> ReportEngine<'a> {
    /// Creates an engine for the given template and periods.
    pub fn new(template: &'a ReportTemplate, periods: &'a [Period]) -> Self {
        Self { template, periods }
    }

    /// Computes the report from account records and balances.
    ///
    /// Each account row's filter is resolved against the records and the
    /// selected balance figure is summed per period; `extra_values` then
    /// overrides or supplements the collected base data by reference code.
    pub fn compute_from_accounts(
        &self,
        resolver: &AccountResolver,
        balances: &AccountBalances,
        extra_values: HashMap<String, Vec<f64>>,
    ) -> Result<ComputedReport, EngineError> {
        self.template.validate()?;

        let mut base: HashMap<String, Vec<f64>> = HashMap::new();
        for row in &self.template.rows {
            if row.row_type != RowType::AccountData {
                continue;
            }
            let Some(code) = row.code() else { continue };
            let totals = match (row.formula(), row.data_source) {
                (Some(text), Some(source)) => {
                    let filter = FilterExpr::parse(text)?;
                    resolver.period_totals(&filter, balances, source, self.periods.len())
                }
                _ => vec![0.0; self.periods.len()],
            };
            base.insert(code.to_string(), totals);
        }
        base.extend(extra_values);

        self.compute(base)
    }

    /// Computes the report from per-code base values.
    ///
    /// `base` supplies period values for account rows (missing codes get
    /// zeros); formula rows are evaluated in dependency order.
    pub fn compute(
        &self,
        base: HashMap<String, Vec<f64>>,
    ) -> Result<ComputedReport, EngineError> {
        self.template.validate()?;

        let period_count = self.periods.len();
        for (code, values) in &base {
            if values.len() != period_count {
                return Err(EngineError::PeriodMismatch {
                    code: code.clone(),
                    got: values.len(),
                    expected: period_count,
                });
            }
        }

        let order = DependencyResolver::new(&self.template.rows).processing_order()?;

        let mut calculator = FormulaCalculator::new(base, period_count);
        let mut values_by_row: HashMap<usize, Vec<f64>> = HashMap::new();

        for idx in order {
            let row = &self.template.rows[idx];
            let values = match row.row_type {
                RowType::Spacing => Vec::new(),
                RowType::AccountData => row
                    .code()
                    .and_then(|code| calculator.values(code).map(<[f64]>::to_vec))
                    .unwrap_or_else(|| vec![0.0; period_count]),
                RowType::FormulaCalculation => match row.formula() {
                    Some(text) => calculator.evaluate_formula(text)?,
                    None => vec![0.0; period_count],
                },
            };
            if let Some(code) = row.code() {
                calculator.insert(code, values.clone());
            }
            debug!(row = idx + 1, code = row.code().unwrap_or(""), "computed row");
            values_by_row.insert(idx, values);
        }

        let rows = self
            .template
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let mut values = values_by_row.remove(&idx).unwrap_or_default();
                if row.inverse_value {
                    for v in &mut values {
                        *v = -*v;
                    }
                }
                let hidden = row.hide_if_zero
                    && !values.is_empty()
                    && values.iter().all(|v| v.abs() < ZERO_TOLERANCE);
                ComputedRow {
                    reference_code: row.code().map(str::to_string),
                    label: row
                        .display_name
                        .clone()
                        .or_else(|| row.code().map(str::to_string))
                        .unwrap_or_default(),
                    row_type: row.row_type,
                    values,
                    indentation_level: row.indentation_level,
                    bold_text: row.bold_text,
                    italic_text: row.italic_text,
                    is_statistical: row.is_statistical,
                    hidden,
                }
            })
            .collect();

        Ok(ComputedReport {
            template_name: self.template.template_name.clone(),
            periods: self.periods.to_vec(),
            rows,
        })
    }
}

/// Fixed-precision display formatting for computed values.
#[derive(Debug, Clone, Copy)]
pub struct DataFormatter {
    precision: usize,
}

impl Default for DataFormatter {
    fn default() -> Self {
        Self { precision: 2 }
    }
}

impl DataFormatter {
    /// Creates a formatter with the given decimal precision.
    pub fn new(precision: usize) -> Self {
        Self { precision }
    }

    /// Formats one value.
    pub fn format_value(&self, value: f64) -> String {
        format!("{:.*}", self.precision, value)
    }

    /// Formats a computed row's values; spacing rows yield no cells.
    pub fn format_values(&self, row: &ComputedRow) -> Vec<String> {
        row.values.iter().map(|v| self.format_value(*v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{DataSource, ReportRow, ReportTemplate, RowType};
    use serde_json::json;

    fn periods() -> Vec<Period> {
        vec![
            Period::new(
                "2023",
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            ),
            Period::new(
                "2024",
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            ),
        ]
    }

    fn pl_template() -> ReportTemplate {
        ReportTemplate::new("Test P&L Template")
            .with_row(
                ReportRow::new(RowType::AccountData)
                    .with_code("INC001")
                    .with_display_name("Income")
                    .with_data_source(DataSource::ClosingBalance)
                    .with_formula(r#"["root_type", "=", "Income"]"#),
            )
            .with_row(
                ReportRow::new(RowType::AccountData)
                    .with_code("EXP001")
                    .with_display_name("Expenses")
                    .with_data_source(DataSource::ClosingBalance)
                    .with_formula(r#"["root_type", "=", "Expense"]"#),
            )
            .with_row(ReportRow::new(RowType::Spacing))
            .with_row(
                ReportRow::new(RowType::FormulaCalculation)
                    .with_code("NET001")
                    .with_display_name("Net Profit/Loss")
                    .with_formula("INC001 - EXP001"),
            )
    }

    fn base_data() -> HashMap<String, Vec<f64>> {
        HashMap::from([
            ("INC001".to_string(), vec![1000.0, 1200.0]),
            ("EXP001".to_string(), vec![800.0, 900.0]),
        ])
    }

    #[test]
    fn test_compute_from_base_values() {
        let template = pl_template();
        let periods = periods();
        let report = ReportEngine::new(&template, &periods)
            .compute(base_data())
            .unwrap();

        assert_eq!(report.rows.len(), 4);
        assert_eq!(report.rows[0].values, vec![1000.0, 1200.0]);
        assert_eq!(report.rows[2].values, Vec::<f64>::new());
        assert_eq!(report.rows[3].values, vec![200.0, 300.0]);
        assert_eq!(report.rows[3].label, "Net Profit/Loss");
    }

    #[test]
    fn test_account_row_without_base_data_is_zero() {
        let template = pl_template();
        let periods = periods();
        let report = ReportEngine::new(&template, &periods)
            .compute(HashMap::from([(
                "INC001".to_string(),
                vec![500.0, 700.0],
            )]))
            .unwrap();

        assert_eq!(report.rows[1].values, vec![0.0, 0.0]);
        assert_eq!(report.rows[3].values, vec![500.0, 700.0]);
    }

    #[test]
    fn test_period_mismatch_rejected() {
        let template = pl_template();
        let periods = periods();
        let result = ReportEngine::new(&template, &periods)
            .compute(HashMap::from([("INC001".to_string(), vec![1.0])]));
        assert!(matches!(result, Err(EngineError::PeriodMismatch { .. })));
    }

    #[test]
    fn test_inverse_value_negates_display() {
        let mut template = pl_template();
        template.rows[1].inverse_value = true;
        let periods = periods();
        let report = ReportEngine::new(&template, &periods)
            .compute(base_data())
            .unwrap();

        assert_eq!(report.rows[1].values, vec![-800.0, -900.0]);
        // Downstream formulas see the raw values.
        assert_eq!(report.rows[3].values, vec![200.0, 300.0]);
    }

    #[test]
    fn test_hide_if_zero() {
        let mut template = pl_template();
        template.rows[1].hide_if_zero = true;
        let periods = periods();
        let report = ReportEngine::new(&template, &periods)
            .compute(HashMap::from([
                ("INC001".to_string(), vec![100.0, 100.0]),
                ("EXP001".to_string(), vec![0.0, 0.0]),
            ]))
            .unwrap();

        assert!(report.rows[1].hidden);
        assert!(!report.rows[0].hidden);
    }

    #[test]
    fn test_compute_from_accounts_end_to_end() {
        let template = pl_template();
        let periods = periods();

        let accounts = [
            json!({"name": "Sales - TC", "root_type": "Income"}),
            json!({"name": "Freight - TC", "root_type": "Expense"}),
        ]
        .into_iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect();
        let resolver = AccountResolver::new(accounts);

        let mut balances = AccountBalances::new();
        balances.insert(
            "Sales - TC".to_string(),
            vec![
                BalanceEntry {
                    closing: 1000.0,
                    ..Default::default()
                },
                BalanceEntry {
                    closing: 1200.0,
                    ..Default::default()
                },
            ],
        );
        balances.insert(
            "Freight - TC".to_string(),
            vec![
                BalanceEntry {
                    closing: 800.0,
                    ..Default::default()
                },
                BalanceEntry {
                    closing: 900.0,
                    ..Default::default()
                },
            ],
        );

        let report = ReportEngine::new(&template, &periods)
            .compute_from_accounts(&resolver, &balances, HashMap::new())
            .unwrap();

        assert_eq!(report.rows[0].values, vec![1000.0, 1200.0]);
        assert_eq!(report.rows[1].values, vec![800.0, 900.0]);
        assert_eq!(report.rows[3].values, vec![200.0, 300.0]);
    }

    #[test]
    fn test_formatter_precision() {
        let formatter = DataFormatter::default();
        assert_eq!(formatter.format_value(1234.5), "1234.50");
        assert_eq!(DataFormatter::new(0).format_value(1234.5), "1235");
    }
}
