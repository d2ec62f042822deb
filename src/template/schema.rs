//! Schema definitions for financial report templates.
//!
//! A template is an ordered list of rows. Each row carries a reference code,
//! a row type, and an optional calculation formula: account rows hold a
//! filter expression selecting the accounts they aggregate, formula rows
//! hold an arithmetic expression over other rows' reference codes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;
use crate::formula::{self, FilterExpr};

use super::resolver::DependencyResolver;

/// Report types a template can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportType {
    #[serde(rename = "Profit and Loss Statement")]
    ProfitAndLoss,
    #[serde(rename = "Balance Sheet")]
    BalanceSheet,
}

/// The kind of data a row represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowType {
    /// Aggregates account balances selected by a filter expression.
    #[serde(rename = "Account Data")]
    AccountData,
    /// Computed from other rows via an arithmetic formula.
    #[serde(rename = "Formula/Calculation")]
    FormulaCalculation,
    /// Visual spacer carrying no values.
    #[serde(rename = "Spacing")]
    Spacing,
}

impl RowType {
    /// Returns the display name used in template files.
    pub fn as_str(&self) -> &'static str {
        match self {
            RowType::AccountData => "Account Data",
            RowType::FormulaCalculation => "Formula/Calculation",
            RowType::Spacing => "Spacing",
        }
    }
}

/// Which balance figure an account row reads per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    #[serde(rename = "Opening Balance")]
    OpeningBalance,
    #[serde(rename = "Closing Balance")]
    ClosingBalance,
    #[serde(rename = "Period Movement")]
    PeriodMovement,
}

/// One line item of a financial report template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Code other rows use to reference this row's values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_code: Option<String>,
    /// Label shown in the rendered report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub row_type: RowType,
    /// Balance figure used by account rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<DataSource>,
    /// Filter expression (account rows) or arithmetic formula (formula rows).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_formula: Option<String>,
    #[serde(default)]
    pub indentation_level: u32,
    #[serde(default)]
    pub bold_text: bool,
    #[serde(default)]
    pub italic_text: bool,
    /// Hide the row when every period value rounds to zero.
    #[serde(default)]
    pub hide_if_zero: bool,
    /// Negate the computed values for display.
    #[serde(default)]
    pub inverse_value: bool,
    /// Informational row excluded from report body styling.
    #[serde(default)]
    pub is_statistical: bool,
}

impl ReportRow {
    /// Creates a bare row of the given type.
    pub fn new(row_type: RowType) -> Self {
        Self {
            reference_code: None,
            display_name: None,
            row_type,
            data_source: None,
            calculation_formula: None,
            indentation_level: 0,
            bold_text: false,
            italic_text: false,
            hide_if_zero: false,
            inverse_value: false,
            is_statistical: false,
        }
    }

    /// Sets the reference code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.reference_code = Some(code.into());
        self
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the calculation formula.
    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.calculation_formula = Some(formula.into());
        self
    }

    /// Sets the data source.
    pub fn with_data_source(mut self, source: DataSource) -> Self {
        self.data_source = Some(source);
        self
    }

    /// Returns the reference code if present and non-empty.
    pub fn code(&self) -> Option<&str> {
        self.reference_code.as_deref().filter(|c| !c.is_empty())
    }

    /// Returns the calculation formula if present and non-empty.
    pub fn formula(&self) -> Option<&str> {
        self.calculation_formula
            .as_deref()
            .filter(|f| !f.is_empty())
    }
}

/// A financial report template: an ordered list of report rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTemplate {
    pub template_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_type: Option<ReportType>,
    /// Standard templates ship with the application and are read-only
    /// in the form editor.
    #[serde(default)]
    pub is_standard: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub rows: Vec<ReportRow>,
}

impl ReportTemplate {
    /// Creates an empty template with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            template_name: name.into(),
            report_type: None,
            is_standard: false,
            disabled: false,
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    pub fn with_row(mut self, row: ReportRow) -> Self {
        self.rows.push(row);
        self
    }

    /// All non-empty reference codes in row order. Duplicates are retained.
    pub fn row_codes(&self) -> Vec<&str> {
        self.rows.iter().filter_map(|r| r.code()).collect()
    }

    /// Validates the template, rejecting it on the first failure.
    ///
    /// Checks, in order: non-empty name, reference code shape and
    /// uniqueness, formula syntax per row type, and that formula rows
    /// reference only existing codes without cycles.
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.template_name.is_empty() {
            return Err(TemplateError::Validation(
                "Template name cannot be empty".to_string(),
            ));
        }

        let code_shape = regex::Regex::new("^[A-Za-z][A-Za-z0-9_]*$")
            .map_err(|e| TemplateError::Validation(e.to_string()))?;

        let mut seen: HashSet<&str> = HashSet::new();
        for (idx, row) in self.rows.iter().enumerate() {
            let row_no = idx + 1;
            if let Some(code) = row.code() {
                if !code_shape.is_match(code) {
                    return Err(TemplateError::InvalidReferenceCode {
                        template: self.template_name.clone(),
                        code: code.to_string(),
                        row: row_no,
                    });
                }
                if !seen.insert(code) {
                    return Err(TemplateError::DuplicateReferenceCode {
                        template: self.template_name.clone(),
                        code: code.to_string(),
                        row: row_no,
                    });
                }
            }
        }

        for (idx, row) in self.rows.iter().enumerate() {
            let row_no = idx + 1;
            let Some(text) = row.formula() else { continue };
            match row.row_type {
                RowType::AccountData => {
                    FilterExpr::parse(text)
                        .map_err(|source| TemplateError::RowFormula { row: row_no, source })?;
                }
                RowType::FormulaCalculation => {
                    formula::parse(text)
                        .map_err(|source| TemplateError::RowFormula { row: row_no, source })?;
                }
                RowType::Spacing => {}
            }
        }

        // Unknown references and cycles surface while ordering.
        DependencyResolver::new(&self.rows).processing_order()?;

        Ok(())
    }
}
