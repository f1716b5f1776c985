//! Lenient numeric extraction from venue JSON.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Extract a decimal field from a venue response object.
///
/// Venues send numbers as JSON numbers, quoted strings, `null`, or not at
/// all. Anything that does not parse yields the caller-supplied default.
pub fn decimal_or(object: &Value, key: &str, default: Option<Decimal>) -> Option<Decimal> {
    match object.get(key) {
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string()).ok().or(default),
        Some(Value::String(s)) => Decimal::from_str(s).ok().or(default),
        _ => default,
    }
}
