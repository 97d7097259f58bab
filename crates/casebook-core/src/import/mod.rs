//! Bulk workbook import: merging spreadsheet rows into the case store.
//!
//! Every row is processed in isolation; a malformed field defaults rather
//! than aborting the batch, and duplicate case or invoice numbers are
//! accumulated into the report instead of overwriting stored data.

mod workbook;

pub use workbook::{read_workbook, Sheet};

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::debug;

use crate::allocate::{allocate, json_map_or_default, parse_insurer_spec};
use crate::error::Result;
use crate::fallback::float_or_default;
use crate::dates::canonical_invoice_date;
use crate::models::case::Case;
use crate::models::invoice::{Invoice, InvoiceStatus};
use crate::store::{CaseStore, Repair, StoreFile};

/// One spreadsheet row, as raw cell text. Coercion to typed fields happens
/// during the merge so every field can default independently.
#[derive(Debug, Clone, Default)]
pub struct SheetRow {
    pub case_no: String,
    pub clients: String,
    pub insured: String,
    pub case_title: String,
    pub date_of_loss: String,
    pub insurers: String,
    pub invoice_no: String,
    pub invoice_date: String,
    pub issuing_office: String,
    pub status: String,
    pub amount_myr: String,
    pub amount_usd: String,
    pub fx_rate: String,
    pub insurer_amounts_myr: String,
    pub insurer_amounts_usd: String,
}

/// Outcome of one import batch.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    /// Case numbers that already existed; their stored records were left
    /// untouched (though new invoices may still have been appended).
    pub duplicate_cases: BTreeSet<String>,

    /// Invoice numbers that already existed on their case and were skipped.
    pub duplicate_invoices: BTreeSet<String>,

    pub cases_added: usize,
    pub invoices_added: usize,

    /// Rows carrying no case reference at all.
    pub rows_skipped: usize,

    /// Self-healing actions taken while loading the store.
    pub repairs: Vec<Repair>,
}

impl ImportReport {
    pub fn has_duplicates(&self) -> bool {
        !self.duplicate_cases.is_empty() || !self.duplicate_invoices.is_empty()
    }
}

/// Merge one row into the store.
///
/// An existing case is never altered beyond appending a new invoice. A new
/// case takes its insurer shares from the row's insurer specification. The
/// row contributes an invoice only if its invoice number is non-empty and
/// not already present on the case.
pub fn merge_row(store: &mut CaseStore, row: &SheetRow, report: &mut ImportReport) {
    let case_no = row.case_no.trim().to_string();
    if case_no.is_empty() {
        debug!("row has no case reference, skipping");
        report.rows_skipped += 1;
        return;
    }

    if store.contains(&case_no) {
        report.duplicate_cases.insert(case_no.clone());
    } else {
        let case = Case {
            clients: row.clients.clone(),
            insured: row.insured.clone(),
            case_title: row.case_title.clone(),
            date_of_loss: row.date_of_loss.clone(),
            insurers: parse_insurer_spec(&row.insurers),
            invoices: Vec::new(),
        };
        store.insert(case_no.clone(), case);
        report.cases_added += 1;
    }

    let invoice_no = row.invoice_no.trim().to_string();
    if invoice_no.is_empty() {
        return;
    }
    let Some(case) = store.get_mut(&case_no) else {
        return;
    };
    if case.has_invoice(&invoice_no) {
        debug!(%case_no, %invoice_no, "duplicate invoice number, skipping");
        report.duplicate_invoices.insert(invoice_no);
        return;
    }

    let total_myr = float_or_default(&row.amount_myr).into_inner();
    let total_usd = float_or_default(&row.amount_usd).into_inner();

    // A row's allocation blob wins when it parses to a non-empty map;
    // otherwise the allocations derive from the case's shares.
    let mut insurer_amounts_myr = json_map_or_default(&row.insurer_amounts_myr).into_inner();
    if insurer_amounts_myr.is_empty() {
        insurer_amounts_myr = allocate(&case.insurers, total_myr);
    }
    let mut insurer_amounts_usd = json_map_or_default(&row.insurer_amounts_usd).into_inner();
    if insurer_amounts_usd.is_empty() {
        insurer_amounts_usd = allocate(&case.insurers, total_usd);
    }

    case.invoices.push(Invoice {
        invoice_no,
        date: canonical_invoice_date(&row.invoice_date).into_inner(),
        issuing_office: row.issuing_office.clone(),
        status: InvoiceStatus::parse(&row.status),
        total_myr,
        total_usd,
        exchange_rate: float_or_default(&row.fx_rate).into_inner(),
        insurer_amounts_myr,
        insurer_amounts_usd,
        verified_insurers: BTreeMap::new(),
    });
    report.invoices_added += 1;
}

/// Merge a sheet's rows in order.
pub fn merge_rows(store: &mut CaseStore, rows: &[SheetRow], report: &mut ImportReport) {
    for row in rows {
        merge_row(store, row, report);
    }
}

/// Import every sheet of a workbook into the store as one batch: one
/// load-merge-save critical section, with the whole store saved atomically
/// afterwards. Duplicates never abort the batch.
pub fn import_workbook(store_file: &StoreFile, path: &Path) -> Result<ImportReport> {
    let sheets = read_workbook(path)?;
    store_file.update_with(|store, repairs| {
        let mut report = ImportReport {
            repairs: repairs.to_vec(),
            ..ImportReport::default()
        };
        for sheet in &sheets {
            debug!(sheet = %sheet.name, rows = sheet.rows.len(), "merging sheet");
            merge_rows(store, &sheet.rows, &mut report);
        }
        Ok(report)
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn case_row(case_no: &str) -> SheetRow {
        SheetRow {
            case_no: case_no.to_string(),
            clients: "Broker & Co".to_string(),
            insured: "Shipper Ltd".to_string(),
            case_title: "Hull damage".to_string(),
            date_of_loss: "04-Jul-2023".to_string(),
            insurers: "A,B,C".to_string(),
            ..SheetRow::default()
        }
    }

    fn invoice_row(case_no: &str, invoice_no: &str) -> SheetRow {
        SheetRow {
            invoice_no: invoice_no.to_string(),
            invoice_date: "01-Jan-2024".to_string(),
            issuing_office: "ABL KL".to_string(),
            status: "Outstanding".to_string(),
            amount_myr: "300".to_string(),
            amount_usd: "100".to_string(),
            fx_rate: "3.0".to_string(),
            ..case_row(case_no)
        }
    }

    #[test]
    fn test_new_case_with_derived_allocations() {
        let mut store = CaseStore::new();
        let mut report = ImportReport::default();
        merge_row(&mut store, &invoice_row("C1", "INV-1"), &mut report);

        assert_eq!(report.cases_added, 1);
        assert_eq!(report.invoices_added, 1);
        assert!(!report.has_duplicates());

        let case = store.get("C1").unwrap();
        assert_eq!(case.insurers["A"], 33.33);
        assert_eq!(case.insurers["C"], 33.34);

        let inv = case.invoice("INV-1").unwrap();
        assert_eq!(inv.date, "2024-01-01");
        assert_eq!(inv.status, InvoiceStatus::Outstanding);
        assert_eq!(inv.insurer_amounts_myr["A"], 99.99);
        assert_eq!(inv.insurer_amounts_myr["B"], 99.99);
        assert_eq!(inv.insurer_amounts_myr["C"], 100.02);
    }

    #[test]
    fn test_blob_allocations_win_over_shares() {
        let mut store = CaseStore::new();
        let mut report = ImportReport::default();
        let row = SheetRow {
            insurer_amounts_myr: "{'A': 210.0, 'B': 90.0}".to_string(),
            ..invoice_row("C1", "INV-1")
        };
        merge_row(&mut store, &row, &mut report);

        let inv = store.get("C1").unwrap().invoice("INV-1").unwrap();
        assert_eq!(inv.insurer_amounts_myr["A"], 210.0);
        assert_eq!(inv.insurer_amounts_myr["B"], 90.0);
        // The USD blob was absent, so USD allocations derive from shares.
        assert_eq!(inv.insurer_amounts_usd["A"], 33.33);
    }

    #[test]
    fn test_duplicate_case_never_alters_stored_fields() {
        let mut store = CaseStore::new();
        let mut report = ImportReport::default();
        merge_row(&mut store, &case_row("C1"), &mut report);

        let altered = SheetRow {
            clients: "Someone Else".to_string(),
            insurers: "X".to_string(),
            ..invoice_row("C1", "INV-2")
        };
        merge_row(&mut store, &altered, &mut report);

        let case = store.get("C1").unwrap();
        assert_eq!(case.clients, "Broker & Co");
        assert_eq!(case.insurers.len(), 3);
        assert!(report.duplicate_cases.contains("C1"));
        // The new invoice still lands on the existing case.
        assert!(case.has_invoice("INV-2"));
    }

    #[test]
    fn test_duplicate_invoice_is_skipped_unchanged() {
        let mut store = CaseStore::new();
        let mut report = ImportReport::default();
        merge_row(&mut store, &invoice_row("C1", "INV-1"), &mut report);
        let original = store.get("C1").unwrap().invoice("INV-1").unwrap().clone();

        let altered = SheetRow {
            amount_myr: "999".to_string(),
            ..invoice_row("C1", "INV-1")
        };
        merge_row(&mut store, &altered, &mut report);

        let case = store.get("C1").unwrap();
        assert_eq!(case.invoices.len(), 1);
        assert_eq!(*case.invoice("INV-1").unwrap(), original);
        assert!(report.duplicate_invoices.contains("INV-1"));
    }

    #[test]
    fn test_case_only_row_contributes_no_invoice() {
        let mut store = CaseStore::new();
        let mut report = ImportReport::default();
        merge_row(&mut store, &case_row("C1"), &mut report);

        assert_eq!(report.invoices_added, 0);
        assert!(store.get("C1").unwrap().invoices.is_empty());
    }

    #[test]
    fn test_blank_case_reference_skips_row() {
        let mut store = CaseStore::new();
        let mut report = ImportReport::default();
        merge_row(&mut store, &invoice_row("   ", "INV-1"), &mut report);

        assert!(store.is_empty());
        assert_eq!(report.rows_skipped, 1);
    }

    #[test]
    fn test_malformed_fields_default() {
        let mut store = CaseStore::new();
        let mut report = ImportReport::default();
        let row = SheetRow {
            invoice_date: "sometime".to_string(),
            amount_myr: "n/a".to_string(),
            fx_rate: String::new(),
            insurer_amounts_myr: "{broken".to_string(),
            status: String::new(),
            ..invoice_row("C1", "INV-1")
        };
        merge_row(&mut store, &row, &mut report);

        let inv = store.get("C1").unwrap().invoice("INV-1").unwrap();
        assert_eq!(inv.date, "sometime");
        assert_eq!(inv.total_myr, 0.0);
        assert_eq!(inv.exchange_rate, 0.0);
        assert_eq!(inv.status, InvoiceStatus::Outstanding);
        // Malformed blob defaulted, so MYR allocations derive from shares
        // of the zero total.
        assert_eq!(inv.insurer_amounts_myr["A"], 0.0);
    }
}
