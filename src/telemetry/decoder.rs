//! # Property Listing Decoder
//!
//! Decodes the text returned by an `ls <path>` request into a
//! [`TelemetrySnapshot`].
//!
//! A listing looks like this, terminated by the server prompt:
//!
//! ```text
//! longitude-deg = '-122.357193' (double)\r\n
//! latitude-deg = '37.613548' (double)\r\n
//! on-ground = 'true' (bool)\r\n
//! />
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

use super::types::{TelemetrySnapshot, TelemetryValue};

/// Row separator used by the property server
pub const ROW_SEPARATOR: &str = "\r\n";

/// `<name> = '<value>' (<type>)`
static PROPERTY_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^=]+?)\s*=\s*'([^']*)'\s*\(([^)\r]*)\)").expect("property row pattern is valid")
});

/// Decode a single listing row
///
/// Returns `None` for rows that do not look like a property, for properties
/// with an empty value, and for `double` values that are not decimal numbers.
///
/// # Examples
///
/// ```
/// use fg_nmea_bridge::telemetry::decoder::decode_row;
/// use fg_nmea_bridge::telemetry::TelemetryValue;
///
/// let (name, value) = decode_row("on-ground = 'true' (bool)").unwrap();
/// assert_eq!(name, "on-ground");
/// assert_eq!(value, TelemetryValue::Bool(true));
/// ```
pub fn decode_row(row: &str) -> Option<(String, TelemetryValue)> {
    let captures = PROPERTY_ROW.captures(row)?;
    let name = captures.get(1)?.as_str().trim();
    let raw = captures.get(2)?.as_str();
    let kind = captures.get(3)?.as_str().trim();

    if name.is_empty() || raw.is_empty() {
        return None;
    }

    let value = match kind {
        "double" => match parse_decimal(raw) {
            Some(value) => TelemetryValue::Decimal(value),
            None => {
                debug!("Skipping {}: '{}' is not a decimal", name, raw);
                return None;
            }
        },
        "bool" => TelemetryValue::Bool(raw == "true"),
        _ => TelemetryValue::Text(raw.to_string()),
    };

    Some((name.to_string(), value))
}

/// Decode a full listing response
///
/// The last `\r\n`-separated piece is the server prompt and is discarded.
/// Rows that cannot be decoded are skipped.
pub fn decode_listing(response: &str) -> TelemetrySnapshot {
    let mut snapshot = TelemetrySnapshot::new();

    let mut rows: Vec<&str> = response.split(ROW_SEPARATOR).collect();
    rows.pop();

    for row in rows {
        if let Some((name, value)) = decode_row(row) {
            snapshot.insert(name, value);
        }
    }

    snapshot
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}
