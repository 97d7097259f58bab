//! CLI application for insurance case reconciliation.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{case, export, import, invoice, match_payment};

/// Insurance case reconciliation - cases, invoices, and payment matching
#[derive(Parser)]
#[command(name = "casebook")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to the store document (default: platform data directory)
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import cases and invoices from xlsx workbooks
    Import(import::ImportArgs),

    /// Manage cases
    Case(case::CaseArgs),

    /// Manage invoices
    Invoice(invoice::InvoiceArgs),

    /// Match a received payment against outstanding invoices
    Match(match_payment::MatchArgs),

    /// Export an invoice summary
    Export(export::ExportArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let store = commands::store_file(cli.store.as_deref());

    // Execute command
    match cli.command {
        Commands::Import(args) => import::run(args, &store),
        Commands::Case(args) => case::run(args, &store),
        Commands::Invoice(args) => invoice::run(args, &store),
        Commands::Match(args) => match_payment::run(args, &store),
        Commands::Export(args) => export::run(args, &store),
    }
}
