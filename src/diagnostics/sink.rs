//! Delivery of advisory diagnostics.
//!
//! The checker itself is pure; how a diagnostic reaches the user is the
//! host's concern. A sink is the seam between the two: the CLI logs through
//! [`TracingSink`], tests collect into a `Vec`.

use tracing::warn;

use super::checker::Diagnostic;

/// Receives advisory diagnostics one at a time.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: &Diagnostic);
}

/// Logs each diagnostic as a warning.
#[derive(Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        warn!(kind = %diagnostic.kind, row = diagnostic.row, "{}", diagnostic.message);
    }
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        self.push(diagnostic.clone());
    }
}

/// Sends every diagnostic to the sink.
pub fn emit_all(diagnostics: &[Diagnostic], sink: &mut dyn DiagnosticSink) {
    for diagnostic in diagnostics {
        sink.emit(diagnostic);
    }
}
