//! Explicit primitive type checks over a raw panel configuration
//!
//! Runs before deserialization so that a wrong type is reported against the
//! exact property path instead of as a generic serde error.

use std::fmt;

use serde_json::Value;

use super::parser::{join_path, ConfigError};

/// JSON primitive types a configuration property can be required to have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl JsonType {
    /// Arrays never satisfy `Object`
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        };
        f.write_str(name)
    }
}

/// Looks up `key` on `parent`, treating `null` as absent
fn property<'v>(
    parent: &'v Value,
    parent_path: &str,
    key: &str,
    expected: JsonType,
    required: bool,
) -> Result<Option<&'v Value>, ConfigError> {
    let path = join_path(parent_path, key);

    match parent.get(key).filter(|value| !value.is_null()) {
        None if required => Err(ConfigError::Missing { path }),
        None => Ok(None),
        Some(value) if expected.matches(value) => Ok(Some(value)),
        Some(_) => Err(ConfigError::WrongType { path, expected }),
    }
}

fn required<'v>(
    parent: &'v Value,
    parent_path: &str,
    key: &str,
    expected: JsonType,
) -> Result<&'v Value, ConfigError> {
    property(parent, parent_path, key, expected, true)?
        .ok_or_else(|| ConfigError::Missing {
            path: join_path(parent_path, key),
        })
}

fn optional<'v>(
    parent: &'v Value,
    parent_path: &str,
    key: &str,
    expected: JsonType,
) -> Result<Option<&'v Value>, ConfigError> {
    property(parent, parent_path, key, expected, false)
}

/// Checks every known property of a panel configuration against its type
pub fn check_panel(raw: &Value) -> Result<(), ConfigError> {
    if raw.is_null() {
        return Err(ConfigError::invalid("", "no configuration was provided"));
    }
    if !JsonType::Object.matches(raw) {
        return Err(ConfigError::WrongType {
            path: "configuration".to_string(),
            expected: JsonType::Object,
        });
    }

    required(raw, "", "title", JsonType::String)?;
    optional(raw, "", "autoConnect", JsonType::Boolean)?;
    optional(raw, "", "startMinimized", JsonType::Boolean)?;
    optional(raw, "", "notifications", JsonType::Boolean)?;

    check_source(required(raw, "", "url", JsonType::Object)?)?;

    let fields = required(raw, "", "fields", JsonType::Array)?;
    if let Some(fields) = fields.as_array() {
        for (index, field) in fields.iter().enumerate() {
            check_field(field, &format!("fields[{index}]"))?;
        }
    }

    Ok(())
}

fn check_source(url: &Value) -> Result<(), ConfigError> {
    const PATH: &str = "url";

    required(url, PATH, "address", JsonType::String)?;
    optional(url, PATH, "method", JsonType::String)?;
    optional(url, PATH, "postData", JsonType::Object)?;
    optional(url, PATH, "interval", JsonType::Number)?;

    if let Some(codes) = optional(url, PATH, "abnormalCloseCodes", JsonType::Array)? {
        for (index, code) in codes.as_array().into_iter().flatten().enumerate() {
            let path = format!("{PATH}.abnormalCloseCodes[{index}]");
            if !JsonType::Number.matches(code) {
                return Err(ConfigError::WrongType {
                    path,
                    expected: JsonType::Number,
                });
            }
            if code.as_u64().map_or(true, |c| c > u64::from(u16::MAX)) {
                return Err(ConfigError::invalid(path, "must be an integer close code"));
            }
        }
    }

    Ok(())
}

fn check_field(field: &Value, path: &str) -> Result<(), ConfigError> {
    if !JsonType::Object.matches(field) {
        return Err(ConfigError::WrongType {
            path: path.to_string(),
            expected: JsonType::Object,
        });
    }

    required(field, path, "prop", JsonType::String)?;
    required(field, path, "label", JsonType::String)?;
    optional(field, path, "suffix", JsonType::String)?;
    optional(field, path, "showLowest", JsonType::Boolean)?;
    optional(field, path, "showHighest", JsonType::Boolean)?;

    for side in ["lowThresholds", "highThresholds"] {
        if let Some(thresholds) = optional(field, path, side, JsonType::Object)? {
            let side_path = join_path(path, side);
            optional(thresholds, &side_path, "warn", JsonType::Number)?;
            optional(thresholds, &side_path, "danger", JsonType::Number)?;
        }
    }

    Ok(())
}
