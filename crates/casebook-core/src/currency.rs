//! Currency reconciliation between MYR and USD invoice totals.

use tracing::warn;

use crate::money::round4;

/// How far a user-entered USD amount may drift from the rate-derived amount
/// before a mismatch is flagged.
pub const MISMATCH_TOLERANCE: f64 = 0.01;

/// Result of reconciling an invoice's two totals against its exchange rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub amount_myr: f64,
    pub amount_usd: f64,
    /// Set when both amounts were entered and they disagree under the rate.
    pub mismatch: Option<AmountMismatch>,
}

/// Advisory warning: the entered amounts disagree with the exchange rate.
/// Neither amount is altered; the user-entered values stay authoritative.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountMismatch {
    pub expected_usd: f64,
    pub entered_usd: f64,
}

/// Fill in whichever total is missing from the other and the rate (MYR per
/// USD), at 4-decimal precision. With a non-positive rate the inputs are
/// returned unchanged; with both amounts present they are cross-checked and
/// left untouched. Idempotent: re-applying to its own output changes nothing.
pub fn calculate_exchange(amount_myr: f64, amount_usd: f64, exchange_rate: f64) -> Exchange {
    let mut result = Exchange {
        amount_myr,
        amount_usd,
        mismatch: None,
    };
    if exchange_rate <= 0.0 {
        return result;
    }

    if amount_myr > 0.0 && amount_usd == 0.0 {
        result.amount_usd = round4(amount_myr / exchange_rate);
    } else if amount_usd > 0.0 && amount_myr == 0.0 {
        result.amount_myr = round4(amount_usd * exchange_rate);
    } else if amount_myr > 0.0 && amount_usd > 0.0 {
        let expected_usd = round4(amount_myr / exchange_rate);
        if (expected_usd - amount_usd).abs() > MISMATCH_TOLERANCE {
            warn!(
                expected_usd,
                entered_usd = amount_usd,
                "amount mismatch between MYR total and USD total"
            );
            result.mismatch = Some(AmountMismatch {
                expected_usd,
                entered_usd: amount_usd,
            });
        }
    }
    result
}
