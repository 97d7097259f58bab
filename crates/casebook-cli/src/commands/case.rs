//! Case command - register, edit, list, and delete cases.

use clap::{Args, Subcommand};
use console::style;

use casebook_core::{parse_insurer_spec, validate_share_sum, Case, StoreFile};

/// Arguments for the case command.
#[derive(Args)]
pub struct CaseArgs {
    #[command(subcommand)]
    command: CaseCommand,
}

#[derive(Subcommand)]
enum CaseCommand {
    /// List cases
    List {
        /// Filter by case-number fragment
        search: Option<String>,
    },

    /// Show one case as stored
    Show {
        case_no: String,
    },

    /// Register a new case
    Add(AddArgs),

    /// Edit a case's fields or insurer shares
    Edit(EditArgs),

    /// Delete a case and all of its invoices
    Delete {
        case_no: String,
    },
}

#[derive(Args)]
struct AddArgs {
    /// Case number (spaces become underscores)
    case_no: String,

    /// Insurer specification: a comma-separated name list, or a
    /// {"name": percentage} map that must sum to 100
    #[arg(long)]
    insurers: String,

    /// Clients / brokers
    #[arg(long, default_value = "")]
    clients: String,

    /// Insured party
    #[arg(long, default_value = "")]
    insured: String,

    /// Case title
    #[arg(long, default_value = "")]
    title: String,

    /// Date of loss
    #[arg(long, default_value = "")]
    date_of_loss: String,
}

#[derive(Args)]
struct EditArgs {
    case_no: String,

    /// New case number
    #[arg(long)]
    rename: Option<String>,

    /// Replacement insurer specification (shares must sum to 100)
    #[arg(long)]
    insurers: Option<String>,

    #[arg(long)]
    clients: Option<String>,

    #[arg(long)]
    insured: Option<String>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    date_of_loss: Option<String>,
}

pub fn run(args: CaseArgs, store: &StoreFile) -> anyhow::Result<()> {
    match args.command {
        CaseCommand::List { search } => list(store, search.as_deref()),
        CaseCommand::Show { case_no } => show(store, &case_no),
        CaseCommand::Add(add) => register(store, add),
        CaseCommand::Edit(edit) => edit_case(store, edit),
        CaseCommand::Delete { case_no } => delete(store, &case_no),
    }
}

fn list(store: &StoreFile, search: Option<&str>) -> anyhow::Result<()> {
    store.read(|cases| {
        let matching = cases.search(search.unwrap_or(""));
        if matching.is_empty() {
            println!("{} No cases found", style("⚠").yellow());
            return;
        }
        for case_no in matching {
            let case = cases.get(case_no).expect("listed case exists");
            println!(
                "{}  {}  {}  ({} invoices)",
                style(case_no).bold(),
                case.clients,
                case.case_title,
                case.invoices.len()
            );
        }
    });
    Ok(())
}

fn show(store: &StoreFile, case_no: &str) -> anyhow::Result<()> {
    let case = store
        .read(|cases| cases.get(case_no).cloned())
        .ok_or_else(|| anyhow::anyhow!("case {case_no} not found"))?;
    println!("{}", serde_json::to_string_pretty(&case)?);
    Ok(())
}

fn register(store: &StoreFile, args: AddArgs) -> anyhow::Result<()> {
    let case = Case {
        clients: args.clients,
        insured: args.insured,
        case_title: args.title,
        date_of_loss: args.date_of_loss,
        insurers: parse_insurer_spec(&args.insurers),
        invoices: Vec::new(),
    };
    let case_no = store.update(|cases| cases.register_case(&args.case_no, case))?;
    println!("{} Registered case {}", style("✓").green(), case_no);
    Ok(())
}

fn edit_case(store: &StoreFile, args: EditArgs) -> anyhow::Result<()> {
    let case_no = store.update(|cases| {
        {
            let case = cases
                .get_mut(&args.case_no)
                .ok_or_else(|| casebook_core::CasebookError::CaseNotFound(args.case_no.clone()))?;

            if let Some(spec) = &args.insurers {
                let insurers = parse_insurer_spec(spec);
                validate_share_sum(&insurers)?;
                // Existing invoices keep their allocation maps; new shares
                // only apply from here on.
                case.insurers = insurers;
            }
            if let Some(clients) = args.clients {
                case.clients = clients;
            }
            if let Some(insured) = args.insured {
                case.insured = insured;
            }
            if let Some(title) = args.title {
                case.case_title = title;
            }
            if let Some(date_of_loss) = args.date_of_loss {
                case.date_of_loss = date_of_loss;
            }
        }

        match &args.rename {
            Some(new_case_no) => cases.rename_case(&args.case_no, new_case_no),
            None => Ok(args.case_no.clone()),
        }
    })?;
    println!("{} Updated case {}", style("✓").green(), case_no);
    Ok(())
}

fn delete(store: &StoreFile, case_no: &str) -> anyhow::Result<()> {
    let removed = store.update(|cases| cases.delete_case(case_no))?;
    println!(
        "{} Deleted case {} and its {} invoices",
        style("✓").green(),
        case_no,
        removed.invoices.len()
    );
    Ok(())
}
