//! Export command - flat per-invoice summary.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use serde::Serialize;

use casebook_core::StoreFile;

/// Arguments for the export command.
#[derive(Args)]
pub struct ExportArgs {
    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum OutputFormat {
    /// CSV rows, one per invoice
    Csv,
    /// JSON array, one object per invoice
    Json,
}

#[derive(Serialize)]
struct ExportRow {
    case_no: String,
    invoice_no: String,
    date: String,
    issuing_office: String,
    status: String,
    total_myr: f64,
    total_usd: f64,
    exchange_rate: f64,
}

pub fn run(args: ExportArgs, store: &StoreFile) -> anyhow::Result<()> {
    let rows = store.read(|cases| {
        cases
            .invoices()
            .map(|(case_no, invoice)| ExportRow {
                case_no: case_no.clone(),
                invoice_no: invoice.invoice_no.clone(),
                date: invoice.date.clone(),
                issuing_office: invoice.issuing_office.clone(),
                status: invoice.status.to_string(),
                total_myr: invoice.total_myr,
                total_usd: invoice.total_usd,
                exchange_rate: invoice.exchange_rate,
            })
            .collect::<Vec<_>>()
    });

    let content = match args.format {
        OutputFormat::Csv => to_csv(&rows)?,
        OutputFormat::Json => serde_json::to_string_pretty(&rows)?,
    };

    match &args.output {
        Some(path) => {
            fs::write(path, content)?;
            println!(
                "{} Exported {} invoices to {}",
                style("✓").green(),
                rows.len(),
                path.display()
            );
        }
        None => print!("{content}"),
    }
    Ok(())
}

fn to_csv(rows: &[ExportRow]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "case_no",
        "invoice_no",
        "date",
        "issuing_office",
        "status",
        "total_myr",
        "total_usd",
        "exchange_rate",
    ])?;

    for row in rows {
        wtr.write_record([
            &row.case_no,
            &row.invoice_no,
            &row.date,
            &row.issuing_office,
            &row.status,
            &row.total_myr.to_string(),
            &row.total_usd.to_string(),
            &row.exchange_rate.to_string(),
        ])?;
    }

    wtr.flush()?;
    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}
