//! # Telemetry Types
//!
//! Typed values decoded from simulator property listings.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;

use crate::error::{BridgeError, Result};

/// Value of one simulator property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryValue {
    /// `double` properties, kept as exact base-10 decimals
    Decimal(Decimal),
    /// `bool` properties
    Bool(bool),
    /// Any other property type, kept verbatim
    Text(String),
}

impl TelemetryValue {
    /// Decimal payload, if this is a `double` property
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            TelemetryValue::Decimal(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for TelemetryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryValue::Decimal(value) => write!(f, "{}", value),
            TelemetryValue::Bool(value) => write!(f, "{}", value),
            TelemetryValue::Text(value) => f.write_str(value),
        }
    }
}

/// All properties gathered during one poll cycle
///
/// Built fresh every cycle and dropped after encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    fields: HashMap<String, TelemetryValue>,
}

impl TelemetrySnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing any previous value under the same name
    pub fn insert(&mut self, name: impl Into<String>, value: TelemetryValue) {
        self.fields.insert(name.into(), value);
    }

    /// Merge another snapshot into this one; its keys win on collision
    pub fn merge(&mut self, other: TelemetrySnapshot) {
        self.fields.extend(other.fields);
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&TelemetryValue> {
        self.fields.get(name)
    }

    /// Look up a field that must be present
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MissingField`] when the field is absent.
    pub fn require(&self, name: &str) -> Result<&TelemetryValue> {
        self.fields
            .get(name)
            .ok_or_else(|| BridgeError::MissingField(name.to_string()))
    }

    /// Look up a field that must be present and decimal
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MissingField`] when the field is absent and
    /// [`BridgeError::NonNumericField`] when it is not a `double`.
    pub fn require_decimal(&self, name: &str) -> Result<Decimal> {
        self.require(name)?
            .as_decimal()
            .ok_or_else(|| BridgeError::NonNumericField(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> TelemetryValue {
        TelemetryValue::Decimal(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_merge_later_wins() {
        let mut first = TelemetrySnapshot::new();
        first.insert("altitude-ft", dec("100"));
        first.insert("heading-deg", dec("10"));

        let mut second = TelemetrySnapshot::new();
        second.insert("altitude-ft", dec("200"));

        first.merge(second);
        assert_eq!(first.len(), 2);
        assert_eq!(first.get("altitude-ft"), Some(&dec("200")));
        assert_eq!(first.get("heading-deg"), Some(&dec("10")));
    }

    #[test]
    fn test_require_missing_field() {
        let snapshot = TelemetrySnapshot::new();
        match snapshot.require("latitude-deg") {
            Err(BridgeError::MissingField(name)) => assert_eq!(name, "latitude-deg"),
            other => panic!("Expected MissingField, got: {:?}", other),
        }
    }

    #[test]
    fn test_require_decimal_rejects_text() {
        let mut snapshot = TelemetrySnapshot::new();
        snapshot.insert("latitude-deg", TelemetryValue::Text("north".into()));
        assert!(matches!(
            snapshot.require_decimal("latitude-deg"),
            Err(BridgeError::NonNumericField(_))
        ));
    }

    #[test]
    fn test_display_keeps_decimal_scale() {
        assert_eq!(dec("12.500000").to_string(), "12.500000");
        assert_eq!(TelemetryValue::Bool(true).to_string(), "true");
        assert_eq!(TelemetryValue::Text("c172p".into()).to_string(), "c172p");
    }
}
