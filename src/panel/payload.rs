//! Decoding of inbound payloads into flat `prop -> value` maps

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when decoding a payload
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Payload is not a JSON object, found: {0}")]
    NotAnObject(&'static str),
}

/// Numeric values carried by one inbound message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    values: Vec<(String, f64)>,
}

impl Payload {
    /// Parses a message body
    pub fn parse(body: &str) -> Result<Self, PayloadError> {
        let json: Value = serde_json::from_str(body)?;
        Self::from_value(&json)
    }

    /// Extracts every numeric property of a flat JSON object.
    ///
    /// Numbers and numeric strings are accepted; anything else is skipped
    /// rather than rejected, since a data source may carry extra fields.
    pub fn from_value(json: &Value) -> Result<Self, PayloadError> {
        let object = json
            .as_object()
            .ok_or_else(|| PayloadError::NotAnObject(type_name(json)))?;

        let mut values = Vec::with_capacity(object.len());
        for (prop, value) in object {
            match extract_float(value) {
                Some(number) => values.push((prop.clone(), number)),
                None => debug!("Skipping non-numeric property '{}': {}", prop, value),
            }
        }

        Ok(Self { values })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(prop, value)| (prop.as_str(), *value))
    }

    pub fn get(&self, prop: &str) -> Option<f64> {
        self.iter().find(|(p, _)| *p == prop).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn extract_float(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    number.is_finite().then_some(number)
}

fn type_name(json: &Value) -> &'static str {
    match json {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_object() {
        let payload = Payload::parse(r#"{"load": 71, "rpm": 1830.5, "rhinocerous": 45}"#).unwrap();
        assert_eq!(payload.len(), 3);
        assert_eq!(payload.get("load"), Some(71.0));
        assert_eq!(payload.get("rpm"), Some(1830.5));
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let payload = Payload::parse(r#"{"temp": "72.5", "status": "ok", "nan": "NaN"}"#).unwrap();
        assert_eq!(payload.get("temp"), Some(72.5));
        assert_eq!(payload.get("status"), None);
        assert_eq!(payload.get("nan"), None);
    }

    #[test]
    fn test_nested_values_are_skipped() {
        let payload = Payload::parse(r#"{"load": 5, "meta": {"a": 1}, "list": [1]}"#).unwrap();
        assert_eq!(payload.len(), 1);
    }

    #[test]
    fn test_malformed_payloads() {
        let err = Payload::parse("not valid json").unwrap_err();
        assert!(err.to_string().contains("JSON parsing error"));

        let err = Payload::parse("[1, 2, 3]").unwrap_err();
        assert_eq!(err.to_string(), "Payload is not a JSON object, found: array");
    }
}
