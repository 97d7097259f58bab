//! Import command - merge workbook rows into the case store.

use std::path::PathBuf;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use casebook_core::{import_workbook, ImportReport, StoreFile};

use super::print_repairs;

/// Arguments for the import command.
#[derive(Args)]
pub struct ImportArgs {
    /// Workbook files or glob patterns
    #[arg(required = true)]
    input: Vec<String>,
}

pub fn run(args: ImportArgs, store: &StoreFile) -> anyhow::Result<()> {
    let mut files: Vec<PathBuf> = Vec::new();
    for pattern in &args.input {
        let path = PathBuf::from(pattern);
        if path.is_file() {
            files.push(path);
            continue;
        }
        for entry in glob::glob(pattern)? {
            files.push(entry?);
        }
    }
    files.retain(|path| {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        matches!(ext.to_lowercase().as_str(), "xlsx" | "xlsm" | "xlsb" | "xls" | "ods")
    });

    if files.is_empty() {
        anyhow::bail!("no matching workbooks found");
    }

    println!(
        "{} Found {} workbooks to import",
        style("ℹ").blue(),
        files.len()
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} workbooks")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut reports = Vec::with_capacity(files.len());
    for path in &files {
        let report = import_workbook(store, path)?;
        reports.push((path, report));
        pb.inc(1);
    }
    pb.finish_and_clear();

    for (path, report) in &reports {
        print_report(&path.display().to_string(), report);
    }
    Ok(())
}

fn print_report(source: &str, report: &ImportReport) {
    println!(
        "{} {}: imported {} cases, {} invoices",
        style("✓").green(),
        source,
        report.cases_added,
        report.invoices_added
    );
    print_repairs(&report.repairs);
    if report.rows_skipped > 0 {
        println!(
            "{} {} rows had no case reference and were skipped",
            style("⚠").yellow(),
            report.rows_skipped
        );
    }
    if !report.duplicate_cases.is_empty() {
        println!(
            "{} Duplicate cases not imported: {}",
            style("⚠").yellow(),
            report
                .duplicate_cases
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    if !report.duplicate_invoices.is_empty() {
        println!(
            "{} Duplicate invoices not imported: {}",
            style("⚠").yellow(),
            report
                .duplicate_invoices
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}
