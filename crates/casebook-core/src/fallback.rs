//! Parse-or-default combinator.
//!
//! Malformed field-level input (amount cells, JSON blobs, dates) never aborts
//! a record; a default is substituted instead. The substitution is tagged so
//! callers and tests can tell a defaulted value from a genuinely empty one.

/// Outcome of a lenient parse: the parsed value, or the default that stood in
/// for unparseable input.
#[derive(Debug, Clone, PartialEq)]
pub enum Fallback<T> {
    /// The input parsed cleanly.
    Parsed(T),
    /// The input was blank or malformed; this is the substituted default.
    Defaulted(T),
}

impl<T> Fallback<T> {
    /// Unwrap the value, discarding the tag.
    pub fn into_inner(self) -> T {
        match self {
            Fallback::Parsed(v) | Fallback::Defaulted(v) => v,
        }
    }

    /// Borrow the value regardless of tag.
    pub fn value(&self) -> &T {
        match self {
            Fallback::Parsed(v) | Fallback::Defaulted(v) => v,
        }
    }

    /// True if the default was substituted.
    pub fn was_defaulted(&self) -> bool {
        matches!(self, Fallback::Defaulted(_))
    }
}

/// Coerce a cell to a float, defaulting to 0.0 on blank or invalid input.
pub fn float_or_default(raw: &str) -> Fallback<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Fallback::Defaulted(0.0);
    }
    match trimmed.parse::<f64>() {
        Ok(v) => Fallback::Parsed(v),
        Err(_) => Fallback::Defaulted(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_parses() {
        assert_eq!(float_or_default("12.5"), Fallback::Parsed(12.5));
        assert_eq!(float_or_default(" 4.7 "), Fallback::Parsed(4.7));
    }

    #[test]
    fn test_float_defaults() {
        let blank = float_or_default("");
        assert!(blank.was_defaulted());
        assert_eq!(*blank.value(), 0.0);

        let junk = float_or_default("n/a");
        assert!(junk.was_defaulted());
        assert_eq!(junk.into_inner(), 0.0);
    }
}
