//! Command-line interface for finreport.
//!
//! Provides commands for template validation, advisory linting, and report
//! computation.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli, Commands};
