//! Typed records for cases, invoices, and payment verification.

pub mod case;
pub mod invoice;

pub use case::{normalize_case_no, Case};
pub use invoice::{Invoice, InvoiceStatus, VerifiedPayment};
