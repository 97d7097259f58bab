//! Match command - pair a received payment with outstanding allocations and
//! record verification decisions.

use clap::Args;
use console::style;

use casebook_core::{
    find_matches, verify_payment, Currency, MatchCandidate, MatchOutcome, MatchSet, StoreFile,
};

/// Arguments for the match command.
#[derive(Args)]
pub struct MatchArgs {
    /// Payment currency (MYR or USD)
    #[arg(long, value_parser = Currency::parse)]
    currency: Currency,

    /// Insurer name fragment to search for
    #[arg(long)]
    insurer: String,

    /// Received amount
    #[arg(long)]
    amount: f64,

    /// Verify candidate N from the listed matches
    #[arg(long)]
    verify: Option<usize>,

    /// Destination account (e.g. SXP, ABL KL, ABL LDN); required with --verify
    #[arg(long)]
    pay_to: Option<String>,

    /// Received amount to record for a close match (defaults to --amount)
    #[arg(long)]
    received: Option<f64>,
}

pub fn run(args: MatchArgs, store: &StoreFile) -> anyhow::Result<()> {
    let outcome = store.read(|cases| {
        find_matches(cases, args.currency, &args.insurer, args.amount)
    });

    let matches = match outcome {
        MatchOutcome::EmptyKeyword => {
            println!(
                "{} Nothing to search: enter an insurer name.",
                style("ℹ").blue()
            );
            return Ok(());
        }
        MatchOutcome::NoMatches => {
            println!(
                "{} No matching invoices found for the given insurer keyword and payment amount.",
                style("ℹ").blue()
            );
            return Ok(());
        }
        MatchOutcome::Found(matches) => matches,
    };

    print_candidates(&matches, args.currency);

    let Some(index) = args.verify else {
        return Ok(());
    };
    let exact_count = matches.exact.len();
    let all: Vec<&MatchCandidate> =
        matches.exact.iter().chain(matches.close.iter()).collect();
    let candidate = *all
        .get(index.wrapping_sub(1))
        .ok_or_else(|| anyhow::anyhow!("no candidate numbered {index}"))?;
    let pay_to = args
        .pay_to
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--pay-to is required to verify a payment"))?;

    // An exact match records the allocated amount; a close match records
    // what actually arrived.
    let received = if index <= exact_count {
        candidate.allocated
    } else {
        args.received.unwrap_or(args.amount)
    };

    let newly_paid = store.update(|cases| {
        verify_payment(
            cases,
            &candidate.case_no,
            &candidate.invoice_no,
            &candidate.insurer,
            received,
            pay_to,
            args.currency,
        )
    })?;

    println!(
        "{} Insurer {} marked as verified on invoice {}.",
        style("✓").green(),
        candidate.insurer,
        candidate.invoice_no
    );
    for (case_no, invoice_no) in newly_paid {
        println!(
            "{} All insurer amounts verified. Invoice {} on case {} updated to PAID.",
            style("✓").green(),
            invoice_no,
            case_no
        );
    }
    Ok(())
}

fn print_candidates(matches: &MatchSet, currency: Currency) {
    let mut index = 0;
    if !matches.exact.is_empty() {
        println!("{}", style("Matched Invoices").bold());
        for candidate in &matches.exact {
            index += 1;
            print_candidate(index, candidate, currency);
        }
    }
    if !matches.close.is_empty() {
        println!("{}", style("Potential Matches").bold());
        for candidate in &matches.close {
            index += 1;
            print_candidate(index, candidate, currency);
        }
    }
}

fn print_candidate(index: usize, candidate: &MatchCandidate, currency: Currency) {
    println!(
        "{:>3}. case {}  invoice {}  insurer {}  expected {:.2} {}",
        index,
        candidate.case_no,
        candidate.invoice_no,
        candidate.insurer,
        candidate.allocated,
        currency
    );
}
