//! Error types for finreport operations.
//!
//! Defines error types for the major subsystems:
//! - Template loading and validation
//! - Formula parsing, evaluation and filter expressions
//! - Report computation

use thiserror::Error;

/// Errors that can occur while loading or validating a report template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template '{0}' not found")]
    TemplateNotFound(String),

    #[error("Failed to parse template file '{path}': {message}")]
    ParseError { path: String, message: String },

    #[error("Template '{template}': duplicate reference code '{code}' in row {row}")]
    DuplicateReferenceCode {
        template: String,
        code: String,
        row: usize,
    },

    #[error("Template '{template}': invalid reference code '{code}' in row {row}")]
    InvalidReferenceCode {
        template: String,
        code: String,
        row: usize,
    },

    #[error("Row {row} references unknown code '{code}'")]
    UnknownReference { code: String, row: usize },

    #[error("Circular reference involving codes: {0}")]
    CircularReference(String),

    #[error("Formula error in row {row}: {source}")]
    RowFormula {
        row: usize,
        #[source]
        source: FormulaError,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while parsing or evaluating formulas and
/// account filter expressions.
#[derive(Debug, Error)]
pub enum FormulaError {
    #[error("Unexpected character '{found}' at position {position}")]
    UnexpectedCharacter { found: char, position: usize },

    #[error("Unexpected token '{0}' in formula")]
    UnexpectedToken(String),

    #[error("Formula ended unexpectedly")]
    UnexpectedEnd,

    #[error("Unclosed parenthesis in formula")]
    UnclosedParenthesis,

    #[error("Invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("Formula references unknown code '{0}'")]
    UnknownReference(String),

    #[error("Invalid filter expression: {0}")]
    InvalidFilter(String),
}

/// Errors that can occur during report computation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Formula error: {0}")]
    Formula(#[from] FormulaError),

    #[error("Base data for code '{code}' has {got} values, expected {expected} periods")]
    PeriodMismatch {
        code: String,
        got: usize,
        expected: usize,
    },
}
