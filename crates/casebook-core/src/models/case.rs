//! Case record: an insurance claim file split across insurers by percentage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::allocate::validate_share_sum;
use crate::error::ValidationError;
use crate::models::invoice::Invoice;

/// An insurance claim case. Identified by its `case_no` key in the store; the
/// key is not repeated inside the record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Case {
    /// Client or broker name.
    #[serde(default)]
    pub clients: String,

    /// Insured party.
    #[serde(default)]
    pub insured: String,

    /// Case title.
    #[serde(default)]
    pub case_title: String,

    /// Date of loss, stored as `DD-Mon-YYYY` text (free text passes through).
    #[serde(default)]
    pub date_of_loss: String,

    /// Insurer name to percentage share. Must sum to 100% within tolerance
    /// before the case is valid for saving.
    #[serde(default)]
    pub insurers: BTreeMap<String, f64>,

    /// Invoices billed against this case, in insertion order.
    #[serde(default)]
    pub invoices: Vec<Invoice>,
}

impl Case {
    /// Check the share-sum invariant.
    pub fn validate_shares(&self) -> Result<(), ValidationError> {
        validate_share_sum(&self.insurers)
    }

    /// Look up an invoice by number, by exact string equality.
    pub fn invoice(&self, invoice_no: &str) -> Option<&Invoice> {
        self.invoices.iter().find(|inv| inv.invoice_no == invoice_no)
    }

    /// Mutable lookup of an invoice by number.
    pub fn invoice_mut(&mut self, invoice_no: &str) -> Option<&mut Invoice> {
        self.invoices
            .iter_mut()
            .find(|inv| inv.invoice_no == invoice_no)
    }

    /// True if an invoice with this number already exists on the case.
    pub fn has_invoice(&self, invoice_no: &str) -> bool {
        self.invoice(invoice_no).is_some()
    }
}

/// Normalize a human-assigned case number: trim, spaces to underscores.
pub fn normalize_case_no(raw: &str) -> String {
    raw.trim().replace(' ', "_")
}
