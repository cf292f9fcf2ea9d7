use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use validator::{ValidationErrors, ValidationErrorsKind};

use super::models::MonitorConfig;
use super::schema::JsonType;
use super::settings::validate;

/// Errors that can occur during configuration parsing and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to open config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {path} is required")]
    Missing { path: String },

    #[error("Invalid configuration: {path} must be of type {expected}")]
    WrongType { path: String, expected: JsonType },

    #[error("Invalid configuration: {}", qualified(.path, .reason))]
    Invalid { path: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Deserialize(#[from] serde_json::Error),
}

fn qualified(path: &str, reason: &str) -> String {
    if path.is_empty() {
        reason.to_string()
    } else {
        format!("{path} {reason}")
    }
}

/// Joins a parent path and a key, e.g. `("fields[2]", "prop")` -> `fields[2].prop`
pub(crate) fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

impl ConfigError {
    pub fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns the path of the offending property, if the error has one
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Missing { path } | Self::WrongType { path, .. } | Self::Invalid { path, .. } => {
                Some(path)
            }
            _ => None,
        }
    }

    /// Re-roots a path-qualified error under `prefix` (e.g. `panels[1]`)
    pub fn within(self, prefix: &str) -> Self {
        match self {
            Self::Missing { path } => Self::Missing {
                path: join_path(prefix, &path),
            },
            Self::WrongType { path, expected } => Self::WrongType {
                path: join_path(prefix, &path),
                expected,
            },
            Self::Invalid { path, reason } => Self::Invalid {
                path: join_path(prefix, &path),
                reason,
            },
            Self::Deserialize(e) => Self::Invalid {
                path: prefix.to_string(),
                reason: e.to_string(),
            },
            other => other,
        }
    }

    /// Converts the first rule violation (in key order) into a path-qualified error
    pub fn from_validation(errors: &ValidationErrors) -> Self {
        first_violation(errors, "")
            .unwrap_or_else(|| Self::invalid("", "configuration failed validation"))
    }
}

fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<ConfigError> {
    let mut keys: Vec<&&'static str> = errors.errors().keys().collect();
    keys.sort();

    for key in keys {
        let path = if *key == "__all__" {
            prefix.to_string()
        } else {
            join_path(prefix, &camel_case(key))
        };

        match &errors.errors()[*key] {
            ValidationErrorsKind::Field(violations) => {
                if let Some(violation) = violations.first() {
                    let path = match violation.params.get("field").and_then(|f| f.as_str()) {
                        Some(field) => join_path(&path, field),
                        None => path,
                    };
                    let reason = violation
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed the '{}' rule", violation.code));
                    return Some(ConfigError::invalid(path, reason));
                }
            }
            ValidationErrorsKind::Struct(nested) => {
                if let Some(error) = first_violation(nested, &path) {
                    return Some(error);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    if let Some(error) = first_violation(nested, &format!("{path}[{index}]")) {
                        return Some(error);
                    }
                }
            }
        }
    }

    None
}

/// Rule errors are keyed by Rust field name; report them with the wire (camelCase) name
fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Provides default configuration file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".realtime-monitor").join("config.yaml"))
}

/// Loads the monitor configuration and validates every panel in it
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<MonitorConfig, ConfigError> {
    // Open the configuration file
    let mut file = File::open(&config_path).map_err(ConfigError::FileError)?;

    // Read the file content
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(ConfigError::FileError)?;

    // Parse YAML
    let config: MonitorConfig = serde_yaml::from_str(&content).map_err(ConfigError::ParseError)?;

    // Validate each panel up front so a bad file fails before anything connects
    for (index, panel) in config.panels.iter().enumerate() {
        let settings = validate(panel).map_err(|e| e.within(&format!("panels[{index}]")))?;
        debug!(
            "Validated panel '{}' ({} field(s))",
            settings.title,
            settings.fields.len()
        );
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let config_str = r#"
            metrics:
              enabled: true
              port: 9100

            panels:
              - title: Site 1
                url:
                  address: https://localhost:8081/status/site1
                  method: GET
                fields:
                  - prop: load
                    label: Load
                    suffix: "%"
                    highThresholds: { warn: 70, danger: 90 }
        "#;

        let config: MonitorConfig = serde_yaml::from_str(config_str).unwrap();
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.port, 9100);
        assert_eq!(config.panels.len(), 1);
        assert_eq!(config.panels[0]["title"], "Site 1");
        assert_eq!(config.panels[0]["fields"][0]["highThresholds"]["danger"], 90);
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("low_thresholds"), "lowThresholds");
        assert_eq!(camel_case("abnormal_close_codes"), "abnormalCloseCodes");
        assert_eq!(camel_case("prop"), "prop");
    }

    #[test]
    fn test_within_prefixes_path() {
        let err = ConfigError::Missing {
            path: "fields[2].prop".to_string(),
        }
        .within("panels[1]");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: panels[1].fields[2].prop is required"
        );
    }
}
