//! Payment matching: pairing received amounts with outstanding allocations.
//!
//! A received payment is matched against every Outstanding invoice's
//! allocation map for the chosen currency, filtered by an insurer-name
//! keyword. Exact matches are within one cent; USD payments additionally
//! surface "close" candidates where the allocation exceeds the received
//! amount by up to 50.00, for explicit user review. Verification decisions
//! are recorded per insurer, and an invoice is promoted to Paid once every
//! allocated insurer is verified.

use tracing::{debug, info};

use crate::error::{CasebookError, Result};
use crate::models::invoice::{InvoiceStatus, VerifiedPayment};
use crate::money::Currency;
use crate::store::CaseStore;

/// An allocation counts as an exact match within this tolerance.
pub const EXACT_TOLERANCE: f64 = 0.01;

/// A USD allocation exceeding the received amount by at most this much is a
/// close match. There is deliberately no MYR equivalent and no band for
/// payments exceeding the allocation.
pub const CLOSE_MATCH_MARGIN: f64 = 50.0;

/// One candidate pairing of a received payment with an allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub case_no: String,
    pub invoice_no: String,
    pub insurer: String,
    /// The allocated amount in the searched currency.
    pub allocated: f64,
}

/// Exact and close candidates for one search.
#[derive(Debug, Clone, Default)]
pub struct MatchSet {
    pub exact: Vec<MatchCandidate>,
    pub close: Vec<MatchCandidate>,
}

/// Search outcome, distinguishing an unusable query from an empty result.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    /// The keyword was empty; there was nothing to search for.
    EmptyKeyword,
    /// The search ran and found no candidates of either kind.
    NoMatches,
    /// Candidates found, needing review or verification.
    Found(MatchSet),
}

/// Scan every Outstanding invoice for allocations matching a received
/// amount, filtered by insurer-name substring (case-insensitive). The first
/// exact match on an invoice wins; scanning that invoice stops there.
pub fn find_matches(
    store: &CaseStore,
    currency: Currency,
    keyword: &str,
    received: f64,
) -> MatchOutcome {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return MatchOutcome::EmptyKeyword;
    }

    let mut matches = MatchSet::default();
    for (case_no, case) in store.cases() {
        for invoice in &case.invoices {
            if !invoice.is_outstanding() {
                continue;
            }
            for (insurer, &allocated) in invoice.allocations(currency) {
                if !insurer.to_lowercase().contains(&keyword) {
                    continue;
                }
                if invoice.verified_insurers.contains_key(insurer) {
                    continue;
                }
                if (allocated - received).abs() < EXACT_TOLERANCE {
                    matches.exact.push(MatchCandidate {
                        case_no: case_no.clone(),
                        invoice_no: invoice.invoice_no.clone(),
                        insurer: insurer.clone(),
                        allocated,
                    });
                    break;
                }
                if currency == Currency::Usd
                    && allocated > received
                    && allocated - received <= CLOSE_MATCH_MARGIN
                {
                    matches.close.push(MatchCandidate {
                        case_no: case_no.clone(),
                        invoice_no: invoice.invoice_no.clone(),
                        insurer: insurer.clone(),
                        allocated,
                    });
                }
            }
        }
    }

    if matches.exact.is_empty() && matches.close.is_empty() {
        MatchOutcome::NoMatches
    } else {
        MatchOutcome::Found(matches)
    }
}

/// Record a verification decision for one insurer on one invoice, then
/// settle statuses across the whole store. Returns the invoices newly
/// promoted to Paid.
pub fn verify_payment(
    store: &mut CaseStore,
    case_no: &str,
    invoice_no: &str,
    insurer: &str,
    received: f64,
    payment_to: &str,
    currency: Currency,
) -> Result<Vec<(String, String)>> {
    let case = store
        .get_mut(case_no)
        .ok_or_else(|| CasebookError::CaseNotFound(case_no.to_string()))?;
    let invoice = case
        .invoice_mut(invoice_no)
        .ok_or_else(|| CasebookError::InvoiceNotFound {
            case_no: case_no.to_string(),
            invoice_no: invoice_no.to_string(),
        })?;

    invoice.verified_insurers.insert(
        insurer.to_string(),
        VerifiedPayment {
            received_amount: received,
            payment_to: payment_to.to_string(),
            currency,
            verified: true,
        },
    );
    info!(case_no, invoice_no, insurer, "payment verified");

    Ok(settle_paid(store))
}

/// Promote every Outstanding invoice whose allocated insurers are all
/// verified to Paid. Runs over the whole store and is idempotent: a second
/// pass with nothing changed writes nothing further.
pub fn settle_paid(store: &mut CaseStore) -> Vec<(String, String)> {
    let mut newly_paid = Vec::new();
    for (case_no, case) in store.cases_mut() {
        for invoice in &mut case.invoices {
            if invoice.is_outstanding() && invoice.is_fully_verified() {
                invoice.status = InvoiceStatus::Paid;
                debug!(%case_no, invoice_no = %invoice.invoice_no, "all insurers verified, invoice paid");
                newly_paid.push((case_no.clone(), invoice.invoice_no.clone()));
            }
        }
    }
    newly_paid
}
