//! Invoice record with per-insurer allocations in two currencies.
//!
//! Persisted field names are pinned to the store's historical document shape,
//! so existing data files load unchanged.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::allocate::allocate;
use crate::money::Currency;

/// A billing record under a case. `invoice_no` is unique within its parent
/// case, not globally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_no: String,

    /// Invoice date, ISO `YYYY-MM-DD` or free text passed through.
    #[serde(rename = "Date of invoice", default)]
    pub date: String,

    #[serde(rename = "issuing office", default)]
    pub issuing_office: String,

    #[serde(rename = "Status", default)]
    pub status: InvoiceStatus,

    #[serde(rename = "Total amount(MYR)", default)]
    pub total_myr: f64,

    #[serde(rename = "Total amount(USD)", default)]
    pub total_usd: f64,

    /// Exchange rate, MYR per USD.
    #[serde(rename = "exchange rate", default)]
    pub exchange_rate: f64,

    /// Per-insurer allocated amounts, frozen at invoice creation time. Later
    /// edits to the case's shares do not rewrite these.
    #[serde(rename = "insurer amounts(MYR)", default)]
    pub insurer_amounts_myr: BTreeMap<String, f64>,

    #[serde(rename = "insurer amounts(USD)", default)]
    pub insurer_amounts_usd: BTreeMap<String, f64>,

    /// Payment verification decisions, keyed by insurer name.
    #[serde(
        rename = "verified_insurers",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub verified_insurers: BTreeMap<String, VerifiedPayment>,
}

impl Invoice {
    /// The allocation map for one currency.
    pub fn allocations(&self, currency: Currency) -> &BTreeMap<String, f64> {
        match currency {
            Currency::Myr => &self.insurer_amounts_myr,
            Currency::Usd => &self.insurer_amounts_usd,
        }
    }

    pub fn is_outstanding(&self) -> bool {
        self.status == InvoiceStatus::Outstanding
    }

    /// Union of insurer names across both allocation maps.
    pub fn allocated_insurers(&self) -> BTreeSet<&str> {
        self.insurer_amounts_myr
            .keys()
            .chain(self.insurer_amounts_usd.keys())
            .map(String::as_str)
            .collect()
    }

    /// True once every allocated insurer has a verification entry. An invoice
    /// with no allocations at all is never considered fully verified.
    pub fn is_fully_verified(&self) -> bool {
        let allocated = self.allocated_insurers();
        if allocated.is_empty() {
            return false;
        }
        let verified: BTreeSet<&str> =
            self.verified_insurers.keys().map(String::as_str).collect();
        allocated == verified
    }

    /// Rebuild both allocation maps from a share map and this invoice's
    /// totals, at 2-decimal precision.
    pub fn recompute_allocations(&mut self, shares: &BTreeMap<String, f64>) {
        self.insurer_amounts_myr = allocate(shares, self.total_myr);
        self.insurer_amounts_usd = allocate(shares, self.total_usd);
    }
}

/// Invoice lifecycle status. `Paid` is terminal; there is no path back to
/// `Outstanding`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum InvoiceStatus {
    #[default]
    Outstanding,
    Paid,
}

impl InvoiceStatus {
    /// Lenient parse: "Paid" in any casing is `Paid`, everything else
    /// (including blank spreadsheet cells) coerces to `Outstanding`.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("paid") {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::Outstanding
        }
    }
}

impl<'de> Deserialize<'de> for InvoiceStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(InvoiceStatus::parse(&raw))
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceStatus::Outstanding => f.write_str("Outstanding"),
            InvoiceStatus::Paid => f.write_str("Paid"),
        }
    }
}

/// One insurer's verified payment against an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedPayment {
    #[serde(rename = "Received Amount")]
    pub received_amount: f64,

    /// Destination account the payment went to.
    #[serde(rename = "Payment to")]
    pub payment_to: String,

    pub currency: Currency,

    pub verified: bool,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn invoice_with_allocations() -> Invoice {
        let mut inv = Invoice {
            invoice_no: "INV-7".to_string(),
            total_myr: 300.0,
            total_usd: 100.0,
            ..Invoice::default()
        };
        inv.insurer_amounts_myr.insert("A".to_string(), 150.0);
        inv.insurer_amounts_myr.insert("B".to_string(), 150.0);
        inv.insurer_amounts_usd.insert("A".to_string(), 50.0);
        inv.insurer_amounts_usd.insert("B".to_string(), 50.0);
        inv
    }

    #[test]
    fn test_status_parse_is_lenient() {
        assert_eq!(InvoiceStatus::parse("Paid"), InvoiceStatus::Paid);
        assert_eq!(InvoiceStatus::parse("PAID"), InvoiceStatus::Paid);
        assert_eq!(InvoiceStatus::parse("Outstanding"), InvoiceStatus::Outstanding);
        assert_eq!(InvoiceStatus::parse(""), InvoiceStatus::Outstanding);
        assert_eq!(InvoiceStatus::parse("pending"), InvoiceStatus::Outstanding);
    }

    #[test]
    fn test_fully_verified_requires_every_insurer() {
        let mut inv = invoice_with_allocations();
        assert!(!inv.is_fully_verified());

        inv.verified_insurers.insert(
            "A".to_string(),
            VerifiedPayment {
                received_amount: 50.0,
                payment_to: "SXP".to_string(),
                currency: Currency::Usd,
                verified: true,
            },
        );
        assert!(!inv.is_fully_verified());

        inv.verified_insurers.insert(
            "B".to_string(),
            VerifiedPayment {
                received_amount: 50.0,
                payment_to: "ABL KL".to_string(),
                currency: Currency::Usd,
                verified: true,
            },
        );
        assert!(inv.is_fully_verified());
    }

    #[test]
    fn test_no_allocations_is_never_verified() {
        let inv = Invoice::default();
        assert!(!inv.is_fully_verified());
    }

    #[test]
    fn test_persisted_field_names() {
        let inv = invoice_with_allocations();
        let json = serde_json::to_value(&inv).unwrap();
        assert!(json.get("Date of invoice").is_some());
        assert!(json.get("issuing office").is_some());
        assert_eq!(json["Status"], "Outstanding");
        assert_eq!(json["Total amount(MYR)"], 300.0);
        assert_eq!(json["insurer amounts(USD)"]["A"], 50.0);
        // Empty verification map is omitted entirely.
        assert!(json.get("verified_insurers").is_none());
    }

    #[test]
    fn test_recompute_allocations() {
        let mut inv = invoice_with_allocations();
        let mut shares = BTreeMap::new();
        shares.insert("A".to_string(), 33.33);
        shares.insert("B".to_string(), 33.33);
        shares.insert("C".to_string(), 33.34);
        inv.recompute_allocations(&shares);
        assert_eq!(inv.insurer_amounts_myr["A"], 99.99);
        assert_eq!(inv.insurer_amounts_myr["C"], 100.02);
        assert_eq!(inv.insurer_amounts_usd["A"], 33.33);
        assert_eq!(inv.insurer_amounts_usd["C"], 33.34);
    }
}
