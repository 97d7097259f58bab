//! Currency tags and monetary rounding.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two currencies an invoice is billed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "MYR")]
    Myr,
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    /// Parse a currency code, case-insensitively.
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MYR" => Ok(Currency::Myr),
            "USD" => Ok(Currency::Usd),
            other => Err(format!("unknown currency: {other} (expected MYR or USD)")),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Myr => f.write_str("MYR"),
            Currency::Usd => f.write_str("USD"),
        }
    }
}

/// Round to 2 decimal places. Allocation amounts are stored at this precision.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to 4 decimal places. Currency conversion works at this precision.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
