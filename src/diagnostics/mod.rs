//! Advisory diagnostics for report templates.
//!
//! The checks in this module run before a template is saved and surface
//! human-readable messages to the editing user. Every diagnostic is
//! advisory: nothing here blocks the save. Checks that reject a template
//! outright live in [`crate::template`] instead.

mod checker;
mod sink;

pub use checker::{check_template, Diagnostic, DiagnosticKind};
pub use sink::{emit_all, DiagnosticSink, TracingSink};
