//! Share allocation from insurer specifications.
//!
//! An insurer specification is either a comma-separated name list, which is
//! auto-split into equal percentage shares, or a `{...}` blob already encoding
//! a name-to-percentage map. Allocation multiplies an invoice total by each
//! share at 2-decimal precision.

use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::fallback::Fallback;
use crate::money::round2;

/// Tolerance for the share-sum invariant: shares must total 100% within this.
pub const SHARE_SUM_TOLERANCE: f64 = 1e-4;

/// Parse an insurer specification into a percentage map.
///
/// A `{...}` blob is parsed as an explicit map and yields an empty map on any
/// parse failure. A name list is split on commas; a single name takes 100%,
/// and for N names each takes `round(100/N, 2)` with the last name absorbing
/// the rounding remainder so the total is exactly 100.0.
pub fn parse_insurer_spec(spec: &str) -> BTreeMap<String, f64> {
    let trimmed = spec.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return json_map_or_default(trimmed).into_inner();
    }

    let names: Vec<&str> = trimmed
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();

    let mut shares = BTreeMap::new();
    match names.len() {
        0 => {}
        1 => {
            shares.insert(names[0].to_string(), 100.0);
        }
        n => {
            let weight = round2(100.0 / n as f64);
            for name in &names {
                shares.insert((*name).to_string(), weight);
            }
            // Last listed name absorbs the remainder; the sum lands on 100.0
            // exactly, not just within tolerance.
            shares.insert(
                names[n - 1].to_string(),
                100.0 - weight * (n - 1) as f64,
            );
        }
    }
    shares
}

/// Parse a `{...}` blob into a name-to-amount map, defaulting to empty.
///
/// Single quotes are normalized to double quotes before parsing. Values may
/// be JSON numbers or numeric strings. Anything else - missing braces, bad
/// JSON, a non-numeric value - yields the empty-map default.
pub fn json_map_or_default(raw: &str) -> Fallback<BTreeMap<String, f64>> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return Fallback::Defaulted(BTreeMap::new());
    }

    let normalized = trimmed.replace('\'', "\"");
    let value: serde_json::Value = match serde_json::from_str(&normalized) {
        Ok(value) => value,
        Err(_) => return Fallback::Defaulted(BTreeMap::new()),
    };
    let object = match value.as_object() {
        Some(object) => object,
        None => return Fallback::Defaulted(BTreeMap::new()),
    };

    let mut map = BTreeMap::new();
    for (name, entry) in object {
        let amount = match entry {
            serde_json::Value::Number(number) => number.as_f64(),
            serde_json::Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        };
        match amount {
            Some(amount) => {
                map.insert(name.clone(), amount);
            }
            None => return Fallback::Defaulted(BTreeMap::new()),
        }
    }
    Fallback::Parsed(map)
}

/// Derive per-insurer amounts from a share map and an invoice total.
pub fn allocate(shares: &BTreeMap<String, f64>, total: f64) -> BTreeMap<String, f64> {
    shares
        .iter()
        .map(|(name, share)| (name.clone(), round2(total * share / 100.0)))
        .collect()
}

/// Check the share-sum invariant: shares must total 100% within tolerance.
pub fn validate_share_sum(shares: &BTreeMap<String, f64>) -> Result<(), ValidationError> {
    let total: f64 = shares.values().sum();
    if (total - 100.0).abs() > SHARE_SUM_TOLERANCE {
        return Err(ValidationError::ShareSum { total });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_empty_spec() {
        assert!(parse_insurer_spec("").is_empty());
        assert!(parse_insurer_spec(" , , ").is_empty());
    }

    #[test]
    fn test_single_name() {
        let shares = parse_insurer_spec("Alpha Re");
        assert_eq!(shares.len(), 1);
        assert_eq!(shares["Alpha Re"], 100.0);
    }

    #[test]
    fn test_three_way_split() {
        let shares = parse_insurer_spec("A,B,C");
        assert_eq!(shares["A"], 33.33);
        assert_eq!(shares["B"], 33.33);
        assert_eq!(shares["C"], 33.34);
        assert_eq!(shares.values().sum::<f64>(), 100.0);
    }

    #[test]
    fn test_split_sums_to_exactly_100() {
        for n in 2..=5 {
            let names: Vec<String> = (0..n).map(|i| format!("Insurer {i}")).collect();
            let shares = parse_insurer_spec(&names.join(", "));
            assert_eq!(shares.len(), n);
            assert_eq!(shares.values().sum::<f64>(), 100.0, "n = {n}");
        }
    }

    #[test]
    fn test_explicit_map() {
        let shares = parse_insurer_spec(r#"{"A": 60.0, "B": 40.0}"#);
        assert_eq!(shares["A"], 60.0);
        assert_eq!(shares["B"], 40.0);
    }

    #[test]
    fn test_explicit_map_single_quotes() {
        let shares = parse_insurer_spec("{'A': 70, 'B': '30'}");
        assert_eq!(shares["A"], 70.0);
        assert_eq!(shares["B"], 30.0);
    }

    #[test]
    fn test_malformed_map_defaults_to_empty() {
        assert!(parse_insurer_spec("{A: sixty}").is_empty());
        assert!(parse_insurer_spec("{broken").len() == 1); // not a map, one name

        let blob = json_map_or_default("{nope");
        assert!(blob.was_defaulted());
        assert!(blob.value().is_empty());
    }

    #[test]
    fn test_allocate_three_way() {
        let shares = parse_insurer_spec("A,B,C");
        let amounts = allocate(&shares, 300.0);
        assert_eq!(amounts["A"], 99.99);
        assert_eq!(amounts["B"], 99.99);
        assert_eq!(amounts["C"], 100.02);
    }

    #[test]
    fn test_share_sum_validation() {
        let mut shares = BTreeMap::new();
        shares.insert("A".to_string(), 60.0);
        shares.insert("B".to_string(), 39.0);
        assert!(validate_share_sum(&shares).is_err());

        shares.insert("B".to_string(), 40.0);
        assert!(validate_share_sum(&shares).is_ok());
    }
}
