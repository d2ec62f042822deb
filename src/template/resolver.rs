//! Row dependency resolution for report templates.
//!
//! Formula rows consume values produced by the rows they reference, so rows
//! are processed in topological order: data rows keep their template order,
//! and a formula row comes after every row it references. Cycles and
//! references to absent codes are reported as template errors.

use std::collections::{BTreeSet, HashMap};

use crate::error::TemplateError;
use crate::formula;

use super::schema::{ReportRow, RowType};

/// Resolves the processing order of a template's rows.
pub struct DependencyResolver<'a> {
    rows: &'a [ReportRow],
}

impl<'a> DependencyResolver<'a> {
    /// Creates a resolver over the given rows.
    pub fn new(rows: &'a [ReportRow]) -> Self {
        Self { rows }
    }

    /// Returns row indices in dependency order.
    ///
    /// Rows without dependencies are emitted in template order. A formula
    /// row is emitted only after every row it references. Errors:
    /// unparseable formulas, references to codes absent from the row set,
    /// and circular references.
    pub fn processing_order(&self) -> Result<Vec<usize>, TemplateError> {
        let mut code_to_idx: HashMap<&str, usize> = HashMap::new();
        for (idx, row) in self.rows.iter().enumerate() {
            if let Some(code) = row.code() {
                // First occurrence wins; duplicates are rejected by
                // template validation.
                code_to_idx.entry(code).or_insert(idx);
            }
        }

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.rows.len()];
        let mut in_degree: Vec<usize> = vec![0; self.rows.len()];

        for (idx, row) in self.rows.iter().enumerate() {
            if row.row_type != RowType::FormulaCalculation {
                continue;
            }
            let Some(text) = row.formula() else { continue };
            let expr = formula::parse(text)
                .map_err(|source| TemplateError::RowFormula { row: idx + 1, source })?;
            for reference in expr.references() {
                let Some(&dep_idx) = code_to_idx.get(reference.as_str()) else {
                    return Err(TemplateError::UnknownReference {
                        code: reference,
                        row: idx + 1,
                    });
                };
                // A self-edge never becomes ready and is reported as a cycle.
                dependents[dep_idx].push(idx);
                in_degree[idx] += 1;
            }
        }

        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(self.rows.len());
        while let Some(idx) = ready.pop_first() {
            order.push(idx);
            for &dependent in &dependents[idx] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != self.rows.len() {
            let stuck: Vec<&str> = self
                .rows
                .iter()
                .enumerate()
                .filter(|(i, _)| !order.contains(i))
                .filter_map(|(_, r)| r.code())
                .collect();
            return Err(TemplateError::CircularReference(stuck.join(", ")));
        }

        Ok(order)
    }
}
