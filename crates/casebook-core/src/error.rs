//! Error types for the casebook-core library.

use thiserror::Error;

/// Main error type for the casebook library.
#[derive(Error, Debug)]
pub enum CasebookError {
    /// Input rejected before any mutation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Store load/save error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Workbook could not be opened or read.
    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    /// Lookup failure for a case number.
    #[error("case {0} not found")]
    CaseNotFound(String),

    /// Lookup failure for an invoice within a case.
    #[error("invoice {invoice_no} not found on case {case_no}")]
    InvoiceNotFound { case_no: String, invoice_no: String },
}

/// Validation failures, reported to the user with no partial write.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A case number is required and was empty after normalization.
    #[error("case number is required")]
    MissingCaseNo,

    /// An invoice number is required and was empty after trimming.
    #[error("invoice number is required")]
    MissingInvoiceNo,

    /// Insurer shares must sum to 100% within tolerance.
    #[error("insurer shares sum to {total}%, expected 100%")]
    ShareSum { total: f64 },

    /// The target case number is already taken.
    #[error("case {0} already exists")]
    DuplicateCase(String),
}

/// Errors from the persistence boundary. Save failures propagate; load
/// failures are handled softly by the caller (empty document).
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store could not be encoded as JSON.
    #[error("failed to encode store: {0}")]
    Encode(#[from] serde_json::Error),

    /// The temp file could not be renamed over the store.
    #[error("failed to persist store: {0}")]
    Persist(String),
}

/// Result type for the casebook library.
pub type Result<T> = std::result::Result<T, CasebookError>;
