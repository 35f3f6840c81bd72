//! Unit-value decoding
//!
//! Splits a raw parameter string such as `"234,5 m³"` into its numeric
//! magnitude and the unit that follows it.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:[.,]\d*)?|[.,]\d+)(?:[eE][+-]?\d+)?")
        .expect("leading number pattern is valid")
});

/// A real magnitude and the unit text that followed it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoubleWithUnit {
    pub value: f64,
    /// Remainder of the raw string, verbatim (may start with a space or be empty)
    pub unit: String,
}

impl DoubleWithUnit {
    /// Create a value with its unit
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    /// Compare magnitudes within `tolerance` and units after trimming
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        (self.value - other.value).abs() <= tolerance && self.unit.trim() == other.unit.trim()
    }
}

impl fmt::Display for DoubleWithUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

/// Decode a raw value string
///
/// Returns `None` for blank input or when the string does not start with a
/// number. A decimal comma is accepted.
pub fn decode(raw: &str) -> Option<DoubleWithUnit> {
    if raw.trim().is_empty() {
        return None;
    }
    let token = LEADING_NUMBER.find(raw)?;
    let value = token.as_str().replace(',', ".").parse::<f64>().ok()?;
    Some(DoubleWithUnit {
        value,
        unit: raw[token.end()..].to_string(),
    })
}

/// Decode an optional raw value (absent values decode to `None`)
pub fn decode_opt(raw: Option<&str>) -> Option<DoubleWithUnit> {
    raw.and_then(decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_decimal_comma_with_unit() {
        let decoded = decode("234,5 m³").unwrap();
        assert_relative_eq!(decoded.value, 234.5);
        assert_eq!(decoded.unit, " m³");
        assert_eq!(decoded.to_string(), "234.5 m³");
    }

    #[test]
    fn test_unit_without_space() {
        let decoded = decode("888mm").unwrap();
        assert_relative_eq!(decoded.value, 888.0);
        assert_eq!(decoded.unit, "mm");
    }

    #[test]
    fn test_number_only() {
        let decoded = decode("56,4").unwrap();
        assert_relative_eq!(decoded.value, 56.4);
        assert_eq!(decoded.unit, "");
    }

    #[test]
    fn test_exponent_and_sign() {
        let decoded = decode("-1.5e3 kg").unwrap();
        assert_relative_eq!(decoded.value, -1500.0);
        assert_eq!(decoded.unit, " kg");

        // An 'e' without digits belongs to the unit
        let decoded = decode("2em").unwrap();
        assert_relative_eq!(decoded.value, 2.0);
        assert_eq!(decoded.unit, "em");
    }

    #[test]
    fn test_non_numeric_is_none() {
        assert!(decode("true m³").is_none());
        assert!(decode("quadprism").is_none());
        assert!(decode("-").is_none());
    }

    #[test]
    fn test_blank_is_none() {
        assert!(decode("").is_none());
        assert!(decode("   ").is_none());
        assert!(decode_opt(None).is_none());
    }

    #[test]
    fn test_unit_is_preserved_verbatim() {
        for (raw, unit) in [("1 kg", " kg"), ("0,25  m", "  m"), ("7deg", "deg"), ("3", "")] {
            let decoded = decode(raw).unwrap();
            assert_eq!(decoded.unit, unit);
            assert!(raw.ends_with(&decoded.unit));
        }
    }
}
