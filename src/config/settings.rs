//! Validated, defaulted per-panel settings

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;
use validator::Validate;

use super::models::{FieldConfig, PanelConfig, SourceConfig, ThresholdConfig};
use super::parser::ConfigError;
use super::schema::check_panel;
use crate::constants::polling::MIN_INTERVAL_SECS;
use crate::constants::socket::DEFAULT_ABNORMAL_CLOSE_CODES;
use crate::panel::threshold::{Bounds, Thresholds};

/// HTTP method for poll requests
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// Request/response polling source
#[derive(Debug, Clone, PartialEq)]
pub struct PollSource {
    pub url: Url,
    pub method: HttpMethod,
    /// Form fields sent with POST requests, in configuration order
    pub form: Vec<(String, String)>,
    pub interval: Duration,
}

/// WebSocket source
#[derive(Debug, Clone, PartialEq)]
pub struct SocketSource {
    pub url: Url,
    pub greeting: Option<Value>,
    pub abnormal_close_codes: BTreeSet<u16>,
}

impl SocketSource {
    /// Whether a close with `code` should start the reconnect loop
    pub fn is_abnormal(&self, code: u16) -> bool {
        self.abnormal_close_codes.contains(&code)
    }
}

/// The transport a panel was resolved to
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Poll(PollSource),
    Socket(SocketSource),
}

impl DataSource {
    pub fn url(&self) -> &Url {
        match self {
            Self::Poll(poll) => &poll.url,
            Self::Socket(socket) => &socket.url,
        }
    }

    /// Short transport label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Poll(_) => "poll",
            Self::Socket(_) => "socket",
        }
    }
}

/// Per-field display and threshold settings
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSettings {
    pub prop: String,
    pub label: String,
    pub suffix: Option<String>,
    pub thresholds: Thresholds,
    pub show_lowest: bool,
    pub show_highest: bool,
}

/// Settings held for a panel's lifetime. Only `notifications` changes after
/// creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub title: String,
    pub source: DataSource,
    pub auto_connect: bool,
    pub start_minimized: bool,
    pub notifications: bool,
    pub fields: Vec<FieldSettings>,
}

impl Settings {
    pub fn field(&self, prop: &str) -> Option<&FieldSettings> {
        self.fields.iter().find(|field| field.prop == prop)
    }

    /// Whether any field has thresholds at all
    pub fn has_thresholds(&self) -> bool {
        self.fields
            .iter()
            .any(|field| field.thresholds.is_configured())
    }
}

/// Validates a raw panel configuration and applies defaults
pub fn validate(raw: &Value) -> Result<Settings, ConfigError> {
    check_panel(raw)?;

    let config: PanelConfig = serde_json::from_value(raw.clone())?;
    config
        .validate()
        .map_err(|errors| ConfigError::from_validation(&errors))?;

    Settings::try_from(config)
}

impl TryFrom<PanelConfig> for Settings {
    type Error = ConfigError;

    fn try_from(config: PanelConfig) -> Result<Self, Self::Error> {
        let source = resolve_source(&config.url)?;

        let mut props = HashSet::with_capacity(config.fields.len());
        let mut fields = Vec::with_capacity(config.fields.len());
        for (index, field) in config.fields.into_iter().enumerate() {
            if !props.insert(field.prop.clone()) {
                return Err(ConfigError::invalid(
                    format!("fields[{index}].prop"),
                    format!("'{}' is already used by another field", field.prop),
                ));
            }
            fields.push(field_settings(field));
        }

        Ok(Self {
            title: config.title,
            source,
            auto_connect: config.auto_connect.unwrap_or(true),
            start_minimized: config.start_minimized.unwrap_or(false),
            notifications: config.notifications.unwrap_or(true),
            fields,
        })
    }
}

fn resolve_source(source: &SourceConfig) -> Result<DataSource, ConfigError> {
    let url = Url::parse(&source.address)
        .map_err(|e| ConfigError::invalid("url.address", format!("must be a valid URL: {e}")))?;

    match url.scheme() {
        "http" | "https" => {
            let method = match source.method.as_deref() {
                Some(method) if method.eq_ignore_ascii_case("POST") => HttpMethod::Post,
                _ => HttpMethod::Get,
            };

            let form = match method {
                HttpMethod::Post => source
                    .post_data
                    .iter()
                    .flatten()
                    .map(|(key, value)| (key.clone(), form_value(value)))
                    .collect(),
                HttpMethod::Get => Vec::new(),
            };

            Ok(DataSource::Poll(PollSource {
                url,
                method,
                form,
                interval: resolve_interval(source.interval)?,
            }))
        }
        "ws" | "wss" => {
            if source.method.is_some() || source.interval.is_some() {
                debug!(
                    "Ignoring url.method/url.interval for socket address {}",
                    source.address
                );
            }

            let abnormal_close_codes = source
                .abnormal_close_codes
                .clone()
                .unwrap_or_else(|| DEFAULT_ABNORMAL_CLOSE_CODES.to_vec())
                .into_iter()
                .collect();

            Ok(DataSource::Socket(SocketSource {
                url,
                greeting: source.ws_greeting.clone(),
                abnormal_close_codes,
            }))
        }
        other => Err(ConfigError::invalid(
            "url.address",
            format!("has unsupported scheme '{other}'"),
        )),
    }
}

/// A configured interval is kept only when strictly greater than the floor
fn resolve_interval(configured: Option<f64>) -> Result<Duration, ConfigError> {
    match configured {
        Some(secs) if secs > MIN_INTERVAL_SECS => Duration::try_from_secs_f64(secs)
            .map_err(|_| ConfigError::invalid("url.interval", "is out of range")),
        _ => Ok(Duration::from_secs_f64(MIN_INTERVAL_SECS)),
    }
}

fn form_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn field_settings(field: FieldConfig) -> FieldSettings {
    FieldSettings {
        thresholds: Thresholds {
            low: field.low_thresholds.map(bounds),
            high: field.high_thresholds.map(bounds),
        },
        show_lowest: field.show_lowest.unwrap_or(true),
        show_highest: field.show_highest.unwrap_or(true),
        prop: field.prop,
        label: field.label,
        suffix: field.suffix,
    }
}

fn bounds(config: ThresholdConfig) -> Bounds {
    Bounds {
        warn: config.warn,
        danger: config.danger,
    }
}
