// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};

use name_reconciliation::compare::ComparisonReport;
use name_reconciliation::{logging, AppConfig, ComparisonSession, Upload};

#[derive(Parser)]
#[command(name = "name-recon", version, about = "Reconcile ledger names against a spreadsheet")]
struct Cli {
    /// Minimum shared tokens for a partial match (overrides RECON_MIN_SHARED_TOKENS)
    #[arg(long, global = true)]
    min_shared_tokens: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare a ledger document with a spreadsheet
    Compare {
        document: PathBuf,
        sheet: PathBuf,

        /// Print the wire JSON instead of the text report
        #[arg(long)]
        json: bool,
    },

    /// Write the records segmented from a ledger document as CSV
    Records { document: PathBuf },

    /// Browse a comparison in the terminal
    View { document: PathBuf, sheet: PathBuf },
}

fn main() -> Result<()> {
    logging::configure_logging();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(n) = cli.min_shared_tokens {
        config.min_shared_tokens = n;
    }
    let session = ComparisonSession::from_config(&config);

    match cli.command {
        Command::Compare { document, sheet, json } => run_compare(&session, &document, &sheet, json),
        Command::Records { document } => run_records(&session, &document),
        Command::View { document, sheet } => run_ui_mode(&session, &document, &sheet),
    }
}

fn run_compare(session: &ComparisonSession, document: &Path, sheet: &Path, json: bool) -> Result<()> {
    let report = session.compare_paths(document, sheet)?;

    if json {
        let out = serde_json::to_string_pretty(&report.result).context("Failed to serialize result")?;
        println!("{}", out);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &ComparisonReport) {
    let result = &report.result;

    println!("⚖️  Name Reconciliation");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Document:    {} ({} records)", report.document_name, report.records.len());
    println!("Spreadsheet: {} ({} names)", report.sheet_name, report.tabular_names);
    println!("{}", result.summary());

    println!("\n✅ In both ({})", result.matched.len());
    for (summary, pairing) in result.matched.iter().zip(&result.pairings) {
        if pairing.canonical_name == pairing.tabular_name {
            println!("   {:<40} {}", summary.raw_name, summary.operation_code);
        } else {
            println!(
                "   {:<40} {:<6} ~ {}",
                summary.raw_name, summary.operation_code, pairing.tabular_name
            );
        }
    }

    println!("\n📄 Only in document ({})", result.only_in_unstructured.len());
    for summary in &result.only_in_unstructured {
        println!("   {:<40} {}", summary.raw_name, summary.operation_code);
    }

    println!("\n📊 Only in spreadsheet ({})", result.only_in_tabular.len());
    for name in &result.only_in_tabular {
        println!("   {}", name);
    }
}

fn run_records(session: &ComparisonSession, document: &Path) -> Result<()> {
    let upload = Upload::from_path(document)?;
    let extractor = name_reconciliation::get_extractor(&upload.file_name);
    let records = session.records_from(extractor.as_ref(), &upload);

    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["canonical_name", "raw_name", "operation_code", "date", "line_number"])?;
    for record in records.values() {
        let date = record.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
        writer.write_record([
            record.canonical_name.as_str(),
            record.raw_name.as_str(),
            record.operation_code.as_str(),
            date.as_str(),
            record.line_number.to_string().as_str(),
        ])?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(session: &ComparisonSession, document: &Path, sheet: &Path) -> Result<()> {
    let report = session.compare_paths(document, sheet)?;

    let mut app = ui::App::new(report);
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_session: &ComparisonSession, _document: &Path, _sheet: &Path) -> Result<()> {
    anyhow::bail!("TUI mode not available, rebuild with: cargo build --features tui")
}
