//! Date canonicalization for loss and invoice dates.
//!
//! Dates arrive as workbook cells (native date cells or free text) and are
//! stored as text: loss dates as `DD-Mon-YYYY`, invoice dates as ISO
//! `YYYY-MM-DD`. Text that matches no known format passes through unchanged.

use chrono::{Duration, NaiveDate};

use crate::fallback::Fallback;

/// Storage format for a case's date of loss.
pub const LOSS_DATE_FORMAT: &str = "%d-%b-%Y";

/// Storage format for an invoice date.
pub const INVOICE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Formats an invoice date may arrive in, tried in order.
const INVOICE_DATE_INPUTS: [&str; 2] = ["%d-%b-%Y", "%Y-%m-%d"];

/// Canonicalize an invoice date to ISO form. Unparseable text passes through
/// unchanged, tagged as defaulted.
pub fn canonical_invoice_date(raw: &str) -> Fallback<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Fallback::Defaulted(String::new());
    }
    for format in INVOICE_DATE_INPUTS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Fallback::Parsed(date.format(INVOICE_DATE_FORMAT).to_string());
        }
    }
    Fallback::Defaulted(raw.to_string())
}

/// Parse a stored invoice date back to a calendar date, if possible.
pub fn parse_invoice_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    INVOICE_DATE_INPUTS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

/// Format a date the way a case's date of loss is stored.
pub fn format_loss_date(date: NaiveDate) -> String {
    date.format(LOSS_DATE_FORMAT).to_string()
}

/// Convert an Excel serial day number to a date.
///
/// Excel's epoch is 1899-12-30, accounting for its 1900 leap year bug.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial as i64))
}
