//! Invoice command - entry, listing, deletion, and the aging report.

use clap::{Args, Subcommand, ValueEnum};
use console::style;

use casebook_core::dates::canonical_invoice_date;
use casebook_core::{
    calculate_exchange, outstanding_aging, AgeBucket, Invoice, InvoiceStatus, StoreFile,
};

/// Arguments for the invoice command.
#[derive(Args)]
pub struct InvoiceArgs {
    #[command(subcommand)]
    command: InvoiceCommand,
}

#[derive(Subcommand)]
enum InvoiceCommand {
    /// List invoices, optionally filtered
    List(ListArgs),

    /// Add or update an invoice on a case
    Add(AddArgs),

    /// Delete one invoice from a case
    Delete {
        case_no: String,
        invoice_no: String,
    },

    /// Age outstanding invoices by days overdue
    Aging(AgingArgs),
}

#[derive(Args)]
struct ListArgs {
    /// Restrict to one case
    #[arg(short, long)]
    case_no: Option<String>,

    /// Filter by status
    #[arg(long, value_enum, default_value = "all")]
    status: StatusFilter,

    /// Restrict to invoices allocating to a matching insurer name
    #[arg(long)]
    insurer: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusFilter {
    All,
    Outstanding,
    Paid,
}

impl StatusFilter {
    fn keeps(self, status: InvoiceStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Outstanding => status == InvoiceStatus::Outstanding,
            StatusFilter::Paid => status == InvoiceStatus::Paid,
        }
    }
}

#[derive(Args)]
struct AddArgs {
    case_no: String,
    invoice_no: String,

    /// Invoice date (DD-Mon-YYYY or YYYY-MM-DD)
    #[arg(long, default_value = "")]
    date: String,

    /// Issuing office (e.g. ABL KL, SXP, ABL SG)
    #[arg(long, default_value = "ABL KL")]
    office: String,

    #[arg(long, value_enum, default_value = "outstanding")]
    status: StatusArg,

    /// Total amount in MYR (derived from USD and the rate when omitted)
    #[arg(long, default_value_t = 0.0)]
    myr: f64,

    /// Total amount in USD (derived from MYR and the rate when omitted)
    #[arg(long, default_value_t = 0.0)]
    usd: f64,

    /// Exchange rate, MYR per USD
    #[arg(long, default_value_t = 0.0)]
    rate: f64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusArg {
    Outstanding,
    Paid,
}

#[derive(Args)]
struct AgingArgs {
    /// Only cases this insurer holds a share in (exact name)
    #[arg(long)]
    insurer: Option<String>,
}

pub fn run(args: InvoiceArgs, store: &StoreFile) -> anyhow::Result<()> {
    match args.command {
        InvoiceCommand::List(list_args) => list(store, list_args),
        InvoiceCommand::Add(add_args) => add(store, add_args),
        InvoiceCommand::Delete { case_no, invoice_no } => delete(store, &case_no, &invoice_no),
        InvoiceCommand::Aging(aging_args) => aging(store, aging_args),
    }
}

fn list(store: &StoreFile, args: ListArgs) -> anyhow::Result<()> {
    let keyword = args.insurer.as_deref().unwrap_or("").trim().to_lowercase();
    store.read(|cases| {
        let mut shown = 0;
        for (case_no, invoice) in cases.invoices() {
            if let Some(wanted) = &args.case_no {
                if case_no != wanted {
                    continue;
                }
            }
            if !args.status.keeps(invoice.status) {
                continue;
            }
            if !keyword.is_empty() && !allocates_to(invoice, &keyword) {
                continue;
            }
            println!(
                "{}  {}  {}  {}  {}  {:.2} MYR  {:.2} USD",
                style(case_no).bold(),
                invoice.invoice_no,
                invoice.date,
                invoice.issuing_office,
                invoice.status,
                invoice.total_myr,
                invoice.total_usd
            );
            shown += 1;
        }
        if shown == 0 {
            println!("{} No invoices found", style("⚠").yellow());
        }
    });
    Ok(())
}

fn allocates_to(invoice: &Invoice, keyword: &str) -> bool {
    invoice
        .insurer_amounts_myr
        .keys()
        .chain(invoice.insurer_amounts_usd.keys())
        .any(|name| name.to_lowercase().contains(keyword))
}

fn add(store: &StoreFile, args: AddArgs) -> anyhow::Result<()> {
    let date = canonical_invoice_date(&args.date);
    if date.was_defaulted() && !args.date.trim().is_empty() {
        println!(
            "{} Date {:?} matches no known format, storing as-is",
            style("⚠").yellow(),
            args.date
        );
    }

    let exchange = calculate_exchange(args.myr, args.usd, args.rate);
    if let Some(mismatch) = &exchange.mismatch {
        println!(
            "{} Amount mismatch: expected {:.4} USD from the MYR total, entered {:.4}",
            style("⚠").yellow(),
            mismatch.expected_usd,
            mismatch.entered_usd
        );
    }

    let invoice = Invoice {
        invoice_no: args.invoice_no.clone(),
        date: date.into_inner(),
        issuing_office: args.office,
        status: match args.status {
            StatusArg::Outstanding => InvoiceStatus::Outstanding,
            StatusArg::Paid => InvoiceStatus::Paid,
        },
        total_myr: exchange.amount_myr,
        total_usd: exchange.amount_usd,
        exchange_rate: args.rate,
        ..Invoice::default()
    };

    store.update(|cases| cases.upsert_invoice(&args.case_no, invoice))?;
    println!(
        "{} Saved invoice {} on case {} ({:.2} MYR / {:.2} USD)",
        style("✓").green(),
        args.invoice_no,
        args.case_no,
        exchange.amount_myr,
        exchange.amount_usd
    );
    Ok(())
}

fn delete(store: &StoreFile, case_no: &str, invoice_no: &str) -> anyhow::Result<()> {
    store.update(|cases| cases.delete_invoice(case_no, invoice_no))?;
    println!(
        "{} Deleted invoice {} from case {}",
        style("✓").green(),
        invoice_no,
        case_no
    );
    Ok(())
}

fn aging(store: &StoreFile, args: AgingArgs) -> anyhow::Result<()> {
    let today = chrono::Local::now().date_naive();
    let entries = store.read(|cases| outstanding_aging(cases, today, args.insurer.as_deref()));

    for bucket in AgeBucket::ALL {
        let in_bucket: Vec<_> = entries.iter().filter(|e| e.bucket == bucket).collect();
        println!(
            "{} ({})",
            style(bucket.label()).bold(),
            in_bucket.len()
        );
        for entry in in_bucket {
            println!(
                "  {}  {}  {}  {} days",
                entry.case_no, entry.invoice_no, entry.date, entry.days_overdue
            );
        }
    }
    Ok(())
}
