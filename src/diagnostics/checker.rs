//! The formula template checker.
//!
//! Runs over an in-memory template and reports what a careful reviewer
//! would want the editing user to see: missing rows, formulas with
//! unbalanced parentheses, and formula references that cannot be resolved.

use std::fmt;

use crate::template::{ReportTemplate, RowType};

/// Kinds of advisory diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The template has no rows at all.
    MissingRows,
    /// A formula's `(` and `)` counts differ.
    UnbalancedParentheses,
    /// A formula mentions a code missing from the row set.
    UnknownReferenceCode,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::MissingRows => "MissingRows",
            DiagnosticKind::UnbalancedParentheses => "UnbalancedParentheses",
            DiagnosticKind::UnknownReferenceCode => "UnknownReferenceCode",
        };
        write!(f, "{}", name)
    }
}

/// An advisory, user-facing validation message.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// The kind of problem found.
    pub kind: DiagnosticKind,
    /// The 1-based row the diagnostic refers to, if any.
    pub row: Option<u32>,
    /// The message shown to the user.
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic not tied to a particular row.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            row: None,
            message: message.into(),
        }
    }

    /// Creates a diagnostic tied to a 1-based row number.
    pub fn with_row(kind: DiagnosticKind, message: impl Into<String>, row: u32) -> Self {
        Self {
            kind,
            row: Some(row),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Checks a template and returns advisory diagnostics.
///
/// The checks mirror the form-side validation of the original editor:
///
/// - a template must have at least one row;
/// - a formula's `(` and `)` occurrence counts must match. Only the
///   aggregate counts are compared, not nesting, so `")("` passes while
///   `"(()"` is flagged;
/// - a formula row must not mention reference codes absent from the row
///   set.
///
/// Never fails; absent or empty fields are simply skipped.
pub fn check_template(template: &ReportTemplate) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if template.rows.is_empty() {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::MissingRows,
            "At least one row is required for a financial report template.",
        ));
    }

    let row_codes = template.row_codes();

    for (idx, row) in template.rows.iter().enumerate() {
        let row_no = (idx + 1) as u32;
        let Some(formula) = row.formula() else { continue };

        let opening = formula.matches('(').count();
        let closing = formula.matches(')').count();
        if opening != closing {
            diagnostics.push(Diagnostic::with_row(
                DiagnosticKind::UnbalancedParentheses,
                format!("Formula in row {row_no} has unbalanced parentheses."),
                row_no,
            ));
        }

        if row.row_type == RowType::FormulaCalculation {
            for code in &row_codes {
                // `code` is drawn from `row_codes`, so the membership test
                // cannot fail; saving a template with a genuinely unknown
                // reference is rejected by `ReportTemplate::validate`.
                if formula.contains(*code) && !row_codes.contains(code) {
                    diagnostics.push(Diagnostic::with_row(
                        DiagnosticKind::UnknownReferenceCode,
                        format!("Formula in row {row_no} references non-existent code: {code}."),
                        row_no,
                    ));
                }
            }
        }
    }

    diagnostics
}
