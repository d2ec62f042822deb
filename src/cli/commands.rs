//! CLI command definitions and handlers.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tracing::{error, info};

use crate::diagnostics::{check_template, emit_all, TracingSink};
use crate::engine::{
    AccountBalances, AccountResolver, ComputedReport, DataFormatter, Period, ReportEngine,
};
use crate::formula::AccountRecord;
use crate::template::{ReportTemplate, RowType, TemplateLoader};

/// Financial report template toolkit.
#[derive(Parser)]
#[command(name = "finreport")]
#[command(about = "Validate, lint and compute financial report templates")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Validate template files: hard checks plus advisory diagnostics.
    Validate(ValidateArgs),

    /// Run only the advisory checks against template files.
    ///
    /// Lint parses without validating, so it also works on templates the
    /// hard checks would reject. Diagnostics go to stdout; the exit code
    /// stays zero.
    Lint(LintArgs),

    /// Compute a report from a template and a data file.
    Compute(ComputeArgs),
}

/// Arguments for `finreport validate`.
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Template files to validate.
    #[arg(required = true)]
    pub templates: Vec<PathBuf>,
}

/// Arguments for `finreport lint`.
#[derive(Parser, Debug)]
pub struct LintArgs {
    /// Template files to check.
    #[arg(required = true)]
    pub templates: Vec<PathBuf>,
}

/// Arguments for `finreport compute`.
#[derive(Parser, Debug)]
pub struct ComputeArgs {
    /// Template file to compute.
    pub template: PathBuf,

    /// Data file with periods, accounts, balances and/or per-code values.
    #[arg(short, long)]
    pub data: PathBuf,

    /// Decimal places in the printed report.
    #[arg(long, default_value = "2")]
    pub precision: usize,

    /// Also print rows hidden by hide-if-zero.
    #[arg(long)]
    pub show_hidden: bool,
}

/// Input for `finreport compute`: everything the engine needs besides the
/// template itself.
#[derive(Debug, Deserialize)]
struct ReportDataFile {
    periods: Vec<Period>,
    #[serde(default)]
    accounts: Vec<AccountRecord>,
    #[serde(default)]
    balances: AccountBalances,
    /// Per-code period values, overriding collected account totals.
    #[serde(default)]
    values: HashMap<String, Vec<f64>>,
}

/// Parses CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Runs the CLI with the parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Validate(args) => run_validate_command(args),
        Commands::Lint(args) => run_lint_command(args),
        Commands::Compute(args) => run_compute_command(args),
    }
}

fn run_validate_command(args: ValidateArgs) -> anyhow::Result<()> {
    let total = args.templates.len();
    let mut failed = 0;
    let mut sink = TracingSink;

    for path in &args.templates {
        let mut loader = TemplateLoader::new();
        match loader.load_file(path) {
            Ok(template) => {
                let diagnostics = check_template(template);
                emit_all(&diagnostics, &mut sink);
                info!(
                    path = %path.display(),
                    template = %template.template_name,
                    advisories = diagnostics.len(),
                    "template is valid"
                );
            }
            Err(e) => {
                error!(path = %path.display(), "{e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {total} template(s) failed validation");
    }
    Ok(())
}

fn run_lint_command(args: LintArgs) -> anyhow::Result<()> {
    for path in &args.templates {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let template: ReportTemplate = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;

        let diagnostics = check_template(&template);
        for diagnostic in &diagnostics {
            println!("{}: {}", path.display(), diagnostic);
        }
        info!(
            path = %path.display(),
            advisories = diagnostics.len(),
            "lint finished"
        );
    }
    Ok(())
}

fn run_compute_command(args: ComputeArgs) -> anyhow::Result<()> {
    let mut loader = TemplateLoader::new();
    let template = loader
        .load_file(&args.template)
        .with_context(|| format!("loading {}", args.template.display()))?;

    let content = fs::read_to_string(&args.data)
        .with_context(|| format!("reading {}", args.data.display()))?;
    let data: ReportDataFile = serde_yaml::from_str(&content)
        .with_context(|| format!("parsing {}", args.data.display()))?;

    let resolver = AccountResolver::new(data.accounts);
    let report = ReportEngine::new(template, &data.periods)
        .compute_from_accounts(&resolver, &data.balances, data.values)
        .with_context(|| format!("computing '{}'", template.template_name))?;

    let formatter = DataFormatter::new(args.precision);
    print_report(&report, &formatter, args.show_hidden);
    Ok(())
}

fn print_report(report: &ComputedReport, formatter: &DataFormatter, show_hidden: bool) {
    println!("{}", report.template_name);

    print!("{:<40}", "");
    for period in &report.periods {
        print!("{:>16}", period.display());
    }
    println!();

    for row in &report.rows {
        if row.hidden && !show_hidden {
            continue;
        }
        if row.row_type == RowType::Spacing {
            println!();
            continue;
        }
        let indent = "  ".repeat(row.indentation_level as usize);
        print!("{:<40}", format!("{indent}{}", row.label));
        for value in formatter.format_values(row) {
            print!("{value:>16}");
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TEMPLATE: &str = r#"
template_name: Mini P&L
rows:
  - reference_code: INC001
    row_type: Account Data
    data_source: Closing Balance
    calculation_formula: '["root_type", "=", "Income"]'
  - reference_code: NET001
    row_type: Formula/Calculation
    calculation_formula: INC001
"#;

    const DATA: &str = r#"
periods:
  - key: "2023"
    from_date: 2023-01-01
    to_date: 2023-12-31
accounts:
  - name: Sales - TC
    root_type: Income
balances:
  Sales - TC:
    - closing: 1000.0
values:
  INC001: [1100.0]
"#;

    fn write_file(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_data_file_parses() {
        let data: ReportDataFile = serde_yaml::from_str(DATA).unwrap();
        assert_eq!(data.periods.len(), 1);
        assert_eq!(data.accounts.len(), 1);
        assert_eq!(data.values["INC001"], vec![1100.0]);
    }

    #[test]
    fn test_validate_command_accepts_valid_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "pl.yaml", TEMPLATE);
        let args = ValidateArgs {
            templates: vec![path],
        };
        assert!(run_validate_command(args).is_ok());
    }

    #[test]
    fn test_validate_command_fails_on_broken_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "bad.yaml",
            "template_name: Bad\nrows:\n  - reference_code: A\n    row_type: Formula/Calculation\n    calculation_formula: MISSING\n",
        );
        let args = ValidateArgs {
            templates: vec![path],
        };
        assert!(run_validate_command(args).is_err());
    }

    #[test]
    fn test_compute_command_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_file(dir.path(), "pl.yaml", TEMPLATE);
        let data = write_file(dir.path(), "data.yaml", DATA);
        let args = ComputeArgs {
            template,
            data,
            precision: 2,
            show_hidden: false,
        };
        assert!(run_compute_command(args).is_ok());
    }

    #[test]
    fn test_lint_command_tolerates_invalid_template() {
        let dir = tempfile::tempdir().unwrap();
        // Unknown reference: rejected by validate, fine for lint.
        let path = write_file(
            dir.path(),
            "odd.yaml",
            "template_name: Odd\nrows:\n  - reference_code: A\n    row_type: Formula/Calculation\n    calculation_formula: (MISSING\n",
        );
        let args = LintArgs {
            templates: vec![path],
        };
        assert!(run_lint_command(args).is_ok());
    }
}
