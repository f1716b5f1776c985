//! Strategy metadata and parameter handling.
//!
//! Descriptors are interrogated by the registry and control plane without
//! instantiating anything. Parameters arrive as a JSON map; typed getters
//! turn missing or ill-typed values into construction errors naming the
//! offending parameter.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Decimal,
    Integer,
    StringList,
}

/// Schema entry for one strategy parameter.
#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: true,
            default: None,
            min: None,
            max: None,
            min_length: None,
        }
    }

    pub fn optional(
        name: &'static str,
        kind: ParamKind,
        description: &'static str,
        default: Value,
    ) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
            default: Some(default),
            min: None,
            max: None,
            min_length: None,
        }
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }
}

/// Static metadata for one strategy implementation.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParamSpec>,
    pub required_exchanges: Vec<&'static str>,
    pub required_markets: Vec<&'static str>,
}

/// Strategy parameter map, immutable after construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(Map<String, Value>);

impl Parameters {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.0
    }

    fn missing(key: &str) -> Error {
        Error::StrategyParams(format!("Missing required parameter: {}", key))
    }

    fn invalid(key: &str, expected: &str) -> Error {
        Error::StrategyParams(format!("Parameter {} must be a {}", key, expected))
    }

    pub fn string(&self, key: &str) -> Result<String> {
        match self.0.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(Self::invalid(key, "string")),
            None => Err(Self::missing(key)),
        }
    }

    pub fn decimal(&self, key: &str) -> Result<Decimal> {
        match self.0.get(key) {
            Some(value) => parse_decimal(value).ok_or_else(|| Self::invalid(key, "number")),
            None => Err(Self::missing(key)),
        }
    }

    pub fn decimal_or(&self, key: &str, default: Decimal) -> Result<Decimal> {
        match self.0.get(key) {
            Some(value) => parse_decimal(value).ok_or_else(|| Self::invalid(key, "number")),
            None => Ok(default),
        }
    }

    pub fn u64_or(&self, key: &str, default: u64) -> Result<u64> {
        match self.0.get(key) {
            Some(Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| Self::invalid(key, "positive integer")),
            Some(_) => Err(Self::invalid(key, "positive integer")),
            None => Ok(default),
        }
    }

    pub fn string_list(&self, key: &str) -> Result<Vec<String>> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(Self::invalid(key, "list of strings")),
                })
                .collect(),
            Some(_) => Err(Self::invalid(key, "list of strings")),
            None => Err(Self::missing(key)),
        }
    }
}

impl From<Map<String, Value>> for Parameters {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Numbers arrive either as JSON numbers or quoted strings.
fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn params(value: Value) -> Parameters {
        match value {
            Value::Object(map) => Parameters::new(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_missing_required_parameter_names_it() {
        let p = Parameters::empty();
        let err = p.string("symbol").unwrap_err();
        assert!(err.to_string().contains("Missing required parameter: symbol"));
    }

    #[test]
    fn test_decimal_accepts_number_and_string() {
        let p = params(json!({"a": 1.5, "b": "2.25"}));
        assert_eq!(p.decimal("a").unwrap(), dec!(1.5));
        assert_eq!(p.decimal("b").unwrap(), dec!(2.25));
    }

    #[test]
    fn test_defaults_apply_only_when_absent() {
        let p = params(json!({"tick_interval": 30}));
        assert_eq!(p.u64_or("tick_interval", 10).unwrap(), 30);
        assert_eq!(p.u64_or("other", 10).unwrap(), 10);
        assert_eq!(p.decimal_or("min_profit", dec!(1)).unwrap(), dec!(1));

        // Present but malformed is an error, not a silent default
        let p = params(json!({"tick_interval": "soon"}));
        assert!(p.u64_or("tick_interval", 10).is_err());
    }

    #[test]
    fn test_string_list() {
        let p = params(json!({"exchanges": ["kraken", "tradeogre"]}));
        assert_eq!(
            p.string_list("exchanges").unwrap(),
            vec!["kraken".to_string(), "tradeogre".to_string()]
        );

        let p = params(json!({"exchanges": "kraken"}));
        assert!(p.string_list("exchanges").is_err());
    }
}
