//! End-to-end tests over the public API: a P&L-shaped template is loaded,
//! validated, ordered, and computed from account balances.

use std::collections::HashMap;

use chrono::NaiveDate;

use finreport::diagnostics::{check_template, DiagnosticKind};
use finreport::engine::{
    AccountBalances, AccountResolver, BalanceEntry, Period, ReportEngine,
};
use finreport::formula::FormulaCalculator;
use finreport::template::{
    DataSource, DependencyResolver, ReportRow, ReportTemplate, RowType, TemplateLoader,
};
use finreport::TemplateError;

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
        .with_row(
            ReportRow::new(RowType::FormulaCalculation)
                .with_code("NET001")
                .with_display_name("Net Profit/Loss")
                .with_formula("INC001 - EXP001"),
        )
}

fn periods() -> Vec<Period> {
    ["2023", "2024", "2025"]
        .iter()
        .map(|year| {
            let y: i32 = year.parse().unwrap();
            Period::new(
                *year,
                NaiveDate::from_ymd_opt(y, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(y, 12, 31).unwrap(),
            )
        })
        .collect()
}

#[test]
fn dependency_resolver_orders_account_rows_before_formula_rows() {
    let template = pl_template();
    let order = DependencyResolver::new(&template.rows)
        .processing_order()
        .unwrap();

    let position = |idx: usize| order.iter().position(|&i| i == idx).unwrap();
    let account_positions = [position(0), position(1)];
    let formula_position = position(2);

    assert!(account_positions.iter().all(|&p| p < formula_position));
}

#[test]
fn formula_calculator_evaluates_net_profit() {
    let row_data = HashMap::from([
        ("INC001".to_string(), vec![1000.0, 1200.0, 1500.0]),
        ("EXP001".to_string(), vec![800.0, 900.0, 1100.0]),
    ]);

    let calculator = FormulaCalculator::new(row_data, 3);
    let result = calculator.evaluate_formula("INC001 - EXP001").unwrap();

    assert_eq!(result, vec![200.0, 300.0, 400.0]);
}

#[test]
fn template_validation_rejects_duplicate_reference_codes() {
    let template = ReportTemplate::new("Invalid Template")
        .with_row(
            ReportRow::new(RowType::AccountData)
                .with_code("DUP001")
                .with_display_name("Row 1")
                .with_data_source(DataSource::ClosingBalance),
        )
        .with_row(
            ReportRow::new(RowType::AccountData)
                .with_code("DUP001")
                .with_display_name("Row 2")
                .with_data_source(DataSource::ClosingBalance),
        );

    assert!(matches!(
        template.validate(),
        Err(TemplateError::DuplicateReferenceCode { .. })
    ));
}

#[test]
fn template_validation_detects_circular_references() {
    let template = ReportTemplate::new("Circular Template")
        .with_row(
            ReportRow::new(RowType::FormulaCalculation)
                .with_code("A001")
                .with_display_name("Row A")
                .with_formula("B001 + 100"),
        )
        .with_row(
            ReportRow::new(RowType::FormulaCalculation)
                .with_code("B001")
                .with_display_name("Row B")
                .with_formula("A001 + 200"),
        );

    assert!(matches!(
        template.validate(),
        Err(TemplateError::CircularReference(_))
    ));
}

#[test]
fn report_computes_from_account_balances() {
    let template = pl_template();
    let periods = periods();

    let accounts = [
        serde_json::json!({"name": "Sales - TC", "root_type": "Income"}),
        serde_json::json!({"name": "Freight - TC", "root_type": "Expense"}),
    ]
    .into_iter()
    .map(|v| v.as_object().unwrap().clone())
    .collect();
    let resolver = AccountResolver::new(accounts);

    let closing = |values: [f64; 3]| {
        values
            .iter()
            .map(|&c| BalanceEntry {
                closing: c,
                ..Default::default()
            })
            .collect::<Vec<_>>()
    };
    let mut balances = AccountBalances::new();
    balances.insert("Sales - TC".to_string(), closing([1000.0, 1200.0, 1500.0]));
    balances.insert("Freight - TC".to_string(), closing([800.0, 900.0, 1100.0]));

    let report = ReportEngine::new(&template, &periods)
        .compute_from_accounts(&resolver, &balances, HashMap::new())
        .unwrap();

    assert_eq!(report.template_name, "Test P&L Template");
    assert_eq!(report.rows[0].values, vec![1000.0, 1200.0, 1500.0]);
    assert_eq!(report.rows[1].values, vec![800.0, 900.0, 1100.0]);
    assert_eq!(report.rows[2].values, vec![200.0, 300.0, 400.0]);
}

#[test]
fn advisory_diagnostics_do_not_block_loading() {
    // A template with an odd but count-balanced formula loads fine and
    // produces no diagnostics; an empty one produces exactly MissingRows.
    let empty = ReportTemplate::new("Empty");
    let diagnostics = check_template(&empty);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::MissingRows);

    let diagnostics = check_template(&pl_template());
    assert!(diagnostics.is_empty());
}

#[test]
fn loader_round_trips_template_files() {
    let yaml = r#"
template_name: Loaded P&L
report_type: Profit and Loss Statement
rows:
  - reference_code: INC001
    display_name: Income
    row_type: Account Data
    data_source: Closing Balance
    calculation_formula: '["root_type", "=", "Income"]'
  - reference_code: NET001
    display_name: Net
    row_type: Formula/Calculation
    calculation_formula: INC001 * 1
"#;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pl.yaml");
    std::fs::write(&path, yaml).unwrap();

    let mut loader = TemplateLoader::new();
    loader.load_file(&path).unwrap();
    let template = loader.get("Loaded P&L").unwrap();

    assert_eq!(template.rows.len(), 2);
    assert_eq!(template.row_codes(), vec!["INC001", "NET001"]);
}
