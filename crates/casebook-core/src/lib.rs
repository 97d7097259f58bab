//! Core library for insurance case reconciliation.
//!
//! This crate provides:
//! - The case store: cases keyed by number, each holding invoices split
//!   across insurers by percentage share
//! - Share allocation from insurer specifications
//! - MYR/USD currency reconciliation
//! - Bulk workbook import with duplicate detection
//! - Payment matching and verification driving invoices to Paid

pub mod allocate;
pub mod currency;
pub mod dates;
pub mod error;
pub mod fallback;
pub mod import;
pub mod matching;
pub mod models;
pub mod money;
pub mod reports;
pub mod store;

pub use error::{CasebookError, Result, StoreError, ValidationError};
pub use models::{normalize_case_no, Case, Invoice, InvoiceStatus, VerifiedPayment};
pub use money::Currency;
pub use allocate::{allocate, parse_insurer_spec, validate_share_sum};
pub use currency::{calculate_exchange, Exchange};
pub use fallback::Fallback;
pub use import::{import_workbook, ImportReport, SheetRow};
pub use matching::{find_matches, settle_paid, verify_payment, MatchCandidate, MatchOutcome, MatchSet};
pub use reports::{outstanding_aging, AgeBucket, AgingEntry};
pub use store::{CaseStore, Repair, StoreFile};
