//! The case store: a keyed document collection of cases and their invoices.
//!
//! The in-memory store is a plain map; `StoreFile` owns the on-disk document
//! and makes each load-mutate-save sequence a single critical section. Loads
//! fail soft (missing or malformed files yield an empty store); saves are
//! whole-document atomic overwrites and propagate I/O errors.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use crate::error::{CasebookError, Result, StoreError, ValidationError};
use crate::models::case::{normalize_case_no, Case};
use crate::models::invoice::Invoice;

/// In-memory collection of cases, keyed by case number.
#[derive(Debug, Clone, Default)]
pub struct CaseStore {
    cases: BTreeMap<String, Case>,
}

impl CaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn contains(&self, case_no: &str) -> bool {
        self.cases.contains_key(case_no)
    }

    pub fn get(&self, case_no: &str) -> Option<&Case> {
        self.cases.get(case_no)
    }

    pub fn get_mut(&mut self, case_no: &str) -> Option<&mut Case> {
        self.cases.get_mut(case_no)
    }

    /// Iterate cases in key order.
    pub fn cases(&self) -> impl Iterator<Item = (&String, &Case)> {
        self.cases.iter()
    }

    /// Iterate cases in key order, mutably.
    pub fn cases_mut(&mut self) -> impl Iterator<Item = (&String, &mut Case)> {
        self.cases.iter_mut()
    }

    /// Iterate every invoice in the store with its parent case number.
    pub fn invoices(&self) -> impl Iterator<Item = (&String, &Invoice)> {
        self.cases
            .iter()
            .flat_map(|(case_no, case)| case.invoices.iter().map(move |inv| (case_no, inv)))
    }

    /// Case numbers whose key contains the query, case-insensitively.
    pub fn search(&self, query: &str) -> Vec<&String> {
        let needle = query.trim().to_lowercase();
        self.cases
            .keys()
            .filter(|case_no| case_no.to_lowercase().contains(&needle))
            .collect()
    }

    /// Insert a case without validation. Import and the decode layer use
    /// this; interactive registration goes through [`CaseStore::register_case`].
    pub fn insert(&mut self, case_no: String, case: Case) {
        self.cases.insert(case_no, case);
    }

    /// Register a new case interactively: the case number is normalized and
    /// required, the share sum must hold, and the number must be free.
    pub fn register_case(&mut self, case_no: &str, case: Case) -> Result<String> {
        let case_no = normalize_case_no(case_no);
        if case_no.is_empty() {
            return Err(ValidationError::MissingCaseNo.into());
        }
        case.validate_shares().map_err(CasebookError::from)?;
        if self.contains(&case_no) {
            return Err(ValidationError::DuplicateCase(case_no).into());
        }
        self.cases.insert(case_no.clone(), case);
        Ok(case_no)
    }

    /// Rename a case, keeping its record intact. Fails if the new number is
    /// empty after normalization or already taken.
    pub fn rename_case(&mut self, case_no: &str, new_case_no: &str) -> Result<String> {
        let new_case_no = normalize_case_no(new_case_no);
        if new_case_no.is_empty() {
            return Err(ValidationError::MissingCaseNo.into());
        }
        if new_case_no == case_no {
            return Ok(new_case_no);
        }
        if self.contains(&new_case_no) {
            return Err(ValidationError::DuplicateCase(new_case_no).into());
        }
        let case = self
            .cases
            .remove(case_no)
            .ok_or_else(|| CasebookError::CaseNotFound(case_no.to_string()))?;
        self.cases.insert(new_case_no.clone(), case);
        Ok(new_case_no)
    }

    /// Delete a case and, with it, all of its invoices.
    pub fn delete_case(&mut self, case_no: &str) -> Result<Case> {
        self.cases
            .remove(case_no)
            .ok_or_else(|| CasebookError::CaseNotFound(case_no.to_string()))
    }

    /// Insert or replace an invoice on a case, recomputing its allocation
    /// maps from the case's current shares. The invoice number is required.
    pub fn upsert_invoice(&mut self, case_no: &str, mut invoice: Invoice) -> Result<()> {
        invoice.invoice_no = invoice.invoice_no.trim().to_string();
        if invoice.invoice_no.is_empty() {
            return Err(ValidationError::MissingInvoiceNo.into());
        }
        let case = self
            .cases
            .get_mut(case_no)
            .ok_or_else(|| CasebookError::CaseNotFound(case_no.to_string()))?;

        invoice.recompute_allocations(&case.insurers);

        match case.invoice_mut(&invoice.invoice_no) {
            Some(existing) => *existing = invoice,
            None => case.invoices.push(invoice),
        }
        Ok(())
    }

    /// Delete one invoice by number. A miss reports failure and leaves the
    /// invoice list unchanged.
    pub fn delete_invoice(&mut self, case_no: &str, invoice_no: &str) -> Result<Invoice> {
        let case = self
            .cases
            .get_mut(case_no)
            .ok_or_else(|| CasebookError::CaseNotFound(case_no.to_string()))?;
        let position = case
            .invoices
            .iter()
            .position(|inv| inv.invoice_no == invoice_no)
            .ok_or_else(|| CasebookError::InvoiceNotFound {
                case_no: case_no.to_string(),
                invoice_no: invoice_no.to_string(),
            })?;
        Ok(case.invoices.remove(position))
    }

}

/// A self-healing action taken while decoding a corrupt document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repair {
    /// A case value was not an object and was dropped.
    DroppedCase { case_no: String },
    /// A case's `invoices` field was not a sequence and was reset to empty.
    ResetInvoices { case_no: String },
    /// One invoice entry could not be decoded and was dropped.
    DroppedInvoice { case_no: String, index: usize },
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repair::DroppedCase { case_no } => {
                write!(f, "case {case_no}: not an object, dropped")
            }
            Repair::ResetInvoices { case_no } => {
                write!(f, "case {case_no}: invoices was not a list, reset to empty")
            }
            Repair::DroppedInvoice { case_no, index } => {
                write!(f, "case {case_no}: invoice entry {index} unreadable, dropped")
            }
        }
    }
}

/// Decode a persisted document leniently. Corrupt shapes are healed in place
/// with a warning rather than failing the whole load.
pub fn decode_document(value: serde_json::Value) -> (CaseStore, Vec<Repair>) {
    let mut store = CaseStore::new();
    let mut repairs = Vec::new();

    let object = match value {
        serde_json::Value::Object(object) => object,
        _ => return (store, repairs),
    };

    for (case_no, case_value) in object {
        let mut case_obj = match case_value {
            serde_json::Value::Object(case_obj) => case_obj,
            _ => {
                warn!(%case_no, "stored case is not an object, dropping");
                repairs.push(Repair::DroppedCase { case_no });
                continue;
            }
        };

        let invoice_values = match case_obj.remove("invoices") {
            None => Vec::new(),
            Some(serde_json::Value::Array(values)) => values,
            Some(_) => {
                warn!(%case_no, "stored invoices field is not a list, resetting");
                repairs.push(Repair::ResetInvoices {
                    case_no: case_no.clone(),
                });
                Vec::new()
            }
        };

        let mut case: Case =
            match serde_json::from_value(serde_json::Value::Object(case_obj)) {
                Ok(case) => case,
                Err(error) => {
                    warn!(%case_no, %error, "stored case is unreadable, dropping");
                    repairs.push(Repair::DroppedCase { case_no });
                    continue;
                }
            };

        for (index, invoice_value) in invoice_values.into_iter().enumerate() {
            match serde_json::from_value::<Invoice>(invoice_value) {
                Ok(invoice) => case.invoices.push(invoice),
                Err(error) => {
                    warn!(%case_no, index, %error, "invoice entry unreadable, dropping");
                    repairs.push(Repair::DroppedInvoice {
                        case_no: case_no.clone(),
                        index,
                    });
                }
            }
        }

        store.insert(case_no, case);
    }

    (store, repairs)
}

/// The on-disk store document. Each load-mutate-save runs under one lock so
/// the sequence is atomic with respect to other callers in this process.
#[derive(Debug)]
pub struct StoreFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl StoreFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the store, failing soft: a missing file or malformed document
    /// yields an empty store.
    pub fn load(&self) -> (CaseStore, Vec<Repair>) {
        let _guard = self.lock.lock().expect("store lock poisoned");
        self.load_locked()
    }

    fn load_locked(&self) -> (CaseStore, Vec<Repair>) {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) => {
                if error.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), %error, "store unreadable, starting empty");
                }
                return (CaseStore::new(), Vec::new());
            }
        };
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => decode_document(value),
            Err(error) => {
                warn!(path = %self.path.display(), %error, "store is not valid JSON, starting empty");
                (CaseStore::new(), Vec::new())
            }
        }
    }

    /// Save the whole store atomically: write a temp file next to the target
    /// and rename it into place. I/O errors propagate.
    pub fn save(&self, store: &CaseStore) -> Result<()> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        self.save_locked(store)
    }

    fn save_locked(&self, store: &CaseStore) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(StoreError::from)?;
        let document = serde_json::to_string_pretty(&store.cases).map_err(StoreError::from)?;

        let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(StoreError::from)?;
        temp.write_all(document.as_bytes()).map_err(StoreError::from)?;
        temp.persist(&self.path)
            .map_err(|error| StoreError::Persist(error.to_string()))?;
        Ok(())
    }

    /// Run one load-mutate-save critical section. The mutation's error
    /// aborts the sequence without writing.
    pub fn update<R>(&self, f: impl FnOnce(&mut CaseStore) -> Result<R>) -> Result<R> {
        self.update_with(|store, _| f(store))
    }

    /// Like [`StoreFile::update`], but the closure also sees the repairs the
    /// load performed on corrupt data.
    pub fn update_with<R>(
        &self,
        f: impl FnOnce(&mut CaseStore, &[Repair]) -> Result<R>,
    ) -> Result<R> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        let (mut store, repairs) = self.load_locked();
        let result = f(&mut store, &repairs)?;
        self.save_locked(&store)?;
        Ok(result)
    }

    /// Run a read-only view of the current store.
    pub fn read<R>(&self, f: impl FnOnce(&CaseStore) -> R) -> R {
        let (store, _) = self.load();
        f(&store)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample_case() -> Case {
        let mut case = Case {
            clients: "Broker & Co".to_string(),
            insured: "Shipper Ltd".to_string(),
            case_title: "Hull damage".to_string(),
            date_of_loss: "04-Jul-2023".to_string(),
            ..Case::default()
        };
        case.insurers.insert("A".to_string(), 60.0);
        case.insurers.insert("B".to_string(), 40.0);
        case
    }

    #[test]
    fn test_register_rejects_bad_shares() {
        let mut store = CaseStore::new();
        let mut case = sample_case();
        case.insurers.insert("B".to_string(), 30.0);
        let err = store.register_case("C1", case).unwrap_err();
        assert!(matches!(
            err,
            CasebookError::Validation(ValidationError::ShareSum { .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_register_normalizes_case_no() {
        let mut store = CaseStore::new();
        let case_no = store.register_case(" ABL SG 042 ", sample_case()).unwrap();
        assert_eq!(case_no, "ABL_SG_042");
        assert!(store.contains("ABL_SG_042"));

        let err = store.register_case("ABL SG 042", sample_case()).unwrap_err();
        assert!(matches!(
            err,
            CasebookError::Validation(ValidationError::DuplicateCase(_))
        ));
    }

    #[test]
    fn test_rename_case_collision() {
        let mut store = CaseStore::new();
        store.register_case("C1", sample_case()).unwrap();
        store.register_case("C2", sample_case()).unwrap();
        assert!(store.rename_case("C1", "C2").is_err());
        assert!(store.contains("C1"));

        let renamed = store.rename_case("C1", "C3").unwrap();
        assert_eq!(renamed, "C3");
        assert!(!store.contains("C1"));
        assert!(store.contains("C3"));
    }

    #[test]
    fn test_upsert_invoice_allocates_from_shares() {
        let mut store = CaseStore::new();
        store.register_case("C1", sample_case()).unwrap();
        store
            .upsert_invoice(
                "C1",
                Invoice {
                    invoice_no: "INV-1".to_string(),
                    total_myr: 300.0,
                    total_usd: 100.0,
                    ..Invoice::default()
                },
            )
            .unwrap();

        let inv = store.get("C1").unwrap().invoice("INV-1").unwrap();
        assert_eq!(inv.insurer_amounts_myr["A"], 180.0);
        assert_eq!(inv.insurer_amounts_myr["B"], 120.0);
        assert_eq!(inv.insurer_amounts_usd["A"], 60.0);
        assert_eq!(inv.insurer_amounts_usd["B"], 40.0);
    }

    #[test]
    fn test_upsert_requires_invoice_no() {
        let mut store = CaseStore::new();
        store.register_case("C1", sample_case()).unwrap();
        let err = store
            .upsert_invoice("C1", Invoice::default())
            .unwrap_err();
        assert!(matches!(
            err,
            CasebookError::Validation(ValidationError::MissingInvoiceNo)
        ));
    }

    #[test]
    fn test_delete_missing_invoice_leaves_list_unchanged() {
        let mut store = CaseStore::new();
        store.register_case("C1", sample_case()).unwrap();
        store
            .upsert_invoice(
                "C1",
                Invoice {
                    invoice_no: "INV-1".to_string(),
                    ..Invoice::default()
                },
            )
            .unwrap();

        assert!(store.delete_invoice("C1", "INV-9").is_err());
        assert_eq!(store.get("C1").unwrap().invoices.len(), 1);

        store.delete_invoice("C1", "INV-1").unwrap();
        assert!(store.get("C1").unwrap().invoices.is_empty());
    }

    #[test]
    fn test_delete_case_cascades_invoices() {
        let mut store = CaseStore::new();
        store.register_case("C1", sample_case()).unwrap();
        store
            .upsert_invoice(
                "C1",
                Invoice {
                    invoice_no: "INV-1".to_string(),
                    ..Invoice::default()
                },
            )
            .unwrap();
        let removed = store.delete_case("C1").unwrap();
        assert_eq!(removed.invoices.len(), 1);
        assert!(store.is_empty());
        assert_eq!(store.invoices().count(), 0);
    }

    #[test]
    fn test_decode_heals_non_list_invoices() {
        let document = serde_json::json!({
            "C1": {
                "clients": "Broker",
                "insurers": {"A": 100.0},
                "invoices": "oops"
            }
        });
        let (store, repairs) = decode_document(document);
        assert_eq!(
            repairs,
            vec![Repair::ResetInvoices {
                case_no: "C1".to_string()
            }]
        );
        assert!(store.get("C1").unwrap().invoices.is_empty());
    }

    #[test]
    fn test_decode_drops_non_object_case() {
        let document = serde_json::json!({
            "C1": "not a case",
            "C2": { "clients": "Broker" }
        });
        let (store, repairs) = decode_document(document);
        assert_eq!(store.len(), 1);
        assert_eq!(
            repairs,
            vec![Repair::DroppedCase {
                case_no: "C1".to_string()
            }]
        );
    }

    #[test]
    fn test_store_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = StoreFile::new(dir.path().join("cases_data.json"));

        // Missing file loads empty.
        let (store, repairs) = file.load();
        assert!(store.is_empty());
        assert!(repairs.is_empty());

        file.update(|store| {
            store.register_case("C1", sample_case())?;
            Ok(())
        })
        .unwrap();

        let (reloaded, _) = file.load();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("C1").unwrap().clients, "Broker & Co");
    }

    #[test]
    fn test_malformed_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases_data.json");
        std::fs::write(&path, "{not json").unwrap();
        let (store, _) = StoreFile::new(&path).load();
        assert!(store.is_empty());
    }
}
