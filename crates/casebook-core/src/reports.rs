//! Aging of outstanding invoices.
//!
//! Outstanding invoices are bucketed by how long they have been open
//! relative to a caller-supplied "today", optionally narrowed to cases a
//! given insurer participates in. Pure with respect to the store snapshot.

use chrono::NaiveDate;

use crate::dates::parse_invoice_date;
use crate::models::case::Case;
use crate::store::CaseStore;

/// Overdue-age buckets for outstanding invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AgeBucket {
    UpToSixMonths,
    SixToTwelveMonths,
    TwelveToEighteenMonths,
    OverEighteenMonths,
}

impl AgeBucket {
    pub const ALL: [AgeBucket; 4] = [
        AgeBucket::UpToSixMonths,
        AgeBucket::SixToTwelveMonths,
        AgeBucket::TwelveToEighteenMonths,
        AgeBucket::OverEighteenMonths,
    ];

    pub fn classify(days_overdue: i64) -> Self {
        match days_overdue {
            ..=180 => AgeBucket::UpToSixMonths,
            181..=365 => AgeBucket::SixToTwelveMonths,
            366..=540 => AgeBucket::TwelveToEighteenMonths,
            _ => AgeBucket::OverEighteenMonths,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBucket::UpToSixMonths => "<= 6 months",
            AgeBucket::SixToTwelveMonths => "6 - 12 months",
            AgeBucket::TwelveToEighteenMonths => "12 - 18 months",
            AgeBucket::OverEighteenMonths => "> 18 months",
        }
    }
}

/// One outstanding invoice's position in the aging report.
#[derive(Debug, Clone, PartialEq)]
pub struct AgingEntry {
    pub case_no: String,
    pub invoice_no: String,
    pub date: NaiveDate,
    pub days_overdue: i64,
    pub bucket: AgeBucket,
}

/// Bucket every Outstanding invoice by days overdue.
///
/// With an insurer filter, only cases where that exact name (compared
/// case-insensitively) holds a share participate. Invoices whose date does
/// not parse are left out of every bucket.
pub fn outstanding_aging(
    store: &CaseStore,
    today: NaiveDate,
    insurer: Option<&str>,
) -> Vec<AgingEntry> {
    let mut entries = Vec::new();
    for (case_no, case) in store.cases() {
        if let Some(name) = insurer {
            if !case_has_insurer(case, name) {
                continue;
            }
        }
        for invoice in &case.invoices {
            if !invoice.is_outstanding() {
                continue;
            }
            let Some(date) = parse_invoice_date(&invoice.date) else {
                continue;
            };
            let days_overdue = (today - date).num_days();
            entries.push(AgingEntry {
                case_no: case_no.clone(),
                invoice_no: invoice.invoice_no.clone(),
                date,
                days_overdue,
                bucket: AgeBucket::classify(days_overdue),
            });
        }
    }
    entries
}

fn case_has_insurer(case: &Case, name: &str) -> bool {
    let name = name.trim();
    case.insurers
        .keys()
        .any(|insurer| insurer.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::invoice::{Invoice, InvoiceStatus};

    fn store_with_dated_invoices(dates: &[(&str, &str)]) -> CaseStore {
        let mut store = CaseStore::new();
        let mut case = Case::default();
        case.insurers.insert("Alpha Re".to_string(), 100.0);
        for (invoice_no, date) in dates {
            case.invoices.push(Invoice {
                invoice_no: (*invoice_no).to_string(),
                date: (*date).to_string(),
                ..Invoice::default()
            });
        }
        store.insert("C1".to_string(), case);
        store
    }

    #[test]
    fn test_bucket_bounds() {
        assert_eq!(AgeBucket::classify(0), AgeBucket::UpToSixMonths);
        assert_eq!(AgeBucket::classify(180), AgeBucket::UpToSixMonths);
        assert_eq!(AgeBucket::classify(181), AgeBucket::SixToTwelveMonths);
        assert_eq!(AgeBucket::classify(365), AgeBucket::SixToTwelveMonths);
        assert_eq!(AgeBucket::classify(366), AgeBucket::TwelveToEighteenMonths);
        assert_eq!(AgeBucket::classify(540), AgeBucket::TwelveToEighteenMonths);
        assert_eq!(AgeBucket::classify(541), AgeBucket::OverEighteenMonths);
    }

    #[test]
    fn test_aging_classifies_by_invoice_date() {
        let store = store_with_dated_invoices(&[
            ("NEW", "2024-05-01"),
            ("OLD", "2022-01-01"),
            ("UNDATED", "pending"),
        ]);
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let entries = outstanding_aging(&store, today, None);

        assert_eq!(entries.len(), 2);
        let new = entries.iter().find(|e| e.invoice_no == "NEW").unwrap();
        assert_eq!(new.days_overdue, 31);
        assert_eq!(new.bucket, AgeBucket::UpToSixMonths);
        let old = entries.iter().find(|e| e.invoice_no == "OLD").unwrap();
        assert_eq!(old.bucket, AgeBucket::OverEighteenMonths);
    }

    #[test]
    fn test_paid_invoices_excluded() {
        let mut store = store_with_dated_invoices(&[("INV-1", "2024-05-01")]);
        store.get_mut("C1").unwrap().invoices[0].status = InvoiceStatus::Paid;
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(outstanding_aging(&store, today, None).is_empty());
    }

    #[test]
    fn test_insurer_filter_is_exact_name() {
        let store = store_with_dated_invoices(&[("INV-1", "2024-05-01")]);
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        assert_eq!(outstanding_aging(&store, today, Some("alpha re")).len(), 1);
        // A fragment is not an exact insurer name.
        assert!(outstanding_aging(&store, today, Some("alpha")).is_empty());
    }
}
