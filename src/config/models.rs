use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;
use validator::{Validate, ValidationError};

use super::metrics_config::MetricsConfig;
use crate::constants::socket::{MAX_CLOSE_CODE, MIN_CLOSE_CODE, NORMAL_CLOSURE};

/// Top-level configuration file for the monitor daemon
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Panel configurations, kept raw so each one is validated with
    /// path-qualified errors when the panel is created
    #[serde(default)]
    pub panels: Vec<Value>,
}

/// Declarative configuration for a single panel
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PanelConfig {
    /// Title shown in the panel's title bar and notifications
    #[validate(length(min = 1, message = "must not be empty"))]
    pub title: String,

    /// Data source descriptor
    #[validate]
    pub url: SourceConfig,

    /// Connect as soon as the panel is created (default: true)
    #[serde(rename = "autoConnect", skip_serializing_if = "Option::is_none")]
    pub auto_connect: Option<bool>,

    /// Create the panel minimized (default: false)
    #[serde(rename = "startMinimized", skip_serializing_if = "Option::is_none")]
    pub start_minimized: Option<bool>,

    /// Raise threshold notifications (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<bool>,

    /// Tracked fields, in display order
    #[validate]
    pub fields: Vec<FieldConfig>,
}

/// Where a panel's data comes from. The address scheme selects the transport.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_post_data"))]
pub struct SourceConfig {
    /// http(s) address to poll or ws(s) address to subscribe to
    #[validate(custom = "validate_address")]
    pub address: String,

    /// GET or POST (polling only, default: GET)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_method")]
    pub method: Option<String>,

    /// Form fields sent with POST requests
    #[serde(rename = "postData", skip_serializing_if = "Option::is_none")]
    pub post_data: Option<Map<String, Value>>,

    /// Poll interval in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<f64>,

    /// Message sent once every time a socket opens
    #[serde(rename = "wsGreeting", skip_serializing_if = "Option::is_none")]
    pub ws_greeting: Option<Value>,

    /// Close codes that trigger reconnection instead of a terminal disconnect
    #[serde(rename = "abnormalCloseCodes", skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_close_codes")]
    pub abnormal_close_codes: Option<Vec<u16>>,
}

/// A tracked numeric field
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FieldConfig {
    /// Key of the value in inbound payloads
    #[validate(length(min = 1, message = "must not be empty"))]
    pub prop: String,

    /// Display label
    pub label: String,

    /// Unit suffix (e.g. "%")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    #[serde(rename = "lowThresholds", skip_serializing_if = "Option::is_none")]
    #[validate]
    pub low_thresholds: Option<ThresholdConfig>,

    #[serde(rename = "highThresholds", skip_serializing_if = "Option::is_none")]
    #[validate]
    pub high_thresholds: Option<ThresholdConfig>,

    /// Permanently display the lowest value seen (default: true)
    #[serde(rename = "showLowest", skip_serializing_if = "Option::is_none")]
    pub show_lowest: Option<bool>,

    /// Permanently display the highest value seen (default: true)
    #[serde(rename = "showHighest", skip_serializing_if = "Option::is_none")]
    pub show_highest: Option<bool>,
}

/// Warn/danger levels for one side of a field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate, PartialEq)]
#[validate(schema(function = "validate_threshold_levels"))]
pub struct ThresholdConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warn: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub danger: Option<f64>,
}

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Validates that the address parses and uses a supported scheme
fn validate_address(address: &str) -> Result<(), ValidationError> {
    let url = Url::parse(address).map_err(|_| rule("invalid_url", "must be a valid URL"))?;

    match url.scheme() {
        "http" | "https" | "ws" | "wss" => Ok(()),
        _ => Err(rule(
            "invalid_scheme",
            "must use one of the schemes http, https, ws or wss",
        )),
    }
}

/// Validates that method is either "GET" or "POST" (case-insensitive)
fn validate_method(method: &str) -> Result<(), ValidationError> {
    match method.to_uppercase().as_str() {
        "GET" | "POST" => Ok(()),
        _ => Err(rule("invalid_method", "must be GET or POST")),
    }
}

fn validate_close_codes(codes: &[u16]) -> Result<(), ValidationError> {
    if codes.contains(&NORMAL_CLOSURE) {
        return Err(rule(
            "normal_closure_code",
            "must not contain the normal closure code 1000",
        ));
    }

    if codes
        .iter()
        .any(|code| !(MIN_CLOSE_CODE..=MAX_CLOSE_CODE).contains(code))
    {
        return Err(rule(
            "close_code_range",
            "must only contain close codes between 1000 and 4999",
        ));
    }

    Ok(())
}

/// POST requests need a non-empty form body
fn validate_post_data(source: &SourceConfig) -> Result<(), ValidationError> {
    let is_post = source
        .method
        .as_deref()
        .is_some_and(|method| method.eq_ignore_ascii_case("POST"));

    if is_post && source.post_data.as_ref().map_or(true, Map::is_empty) {
        let mut error = rule(
            "post_data_required",
            "must be a non-empty object when url.method is POST",
        );
        error.add_param("field".into(), &"postData");
        return Err(error);
    }

    Ok(())
}

fn validate_threshold_levels(thresholds: &ThresholdConfig) -> Result<(), ValidationError> {
    if thresholds.warn.is_none() && thresholds.danger.is_none() {
        return Err(rule(
            "missing_threshold_level",
            "must define warn, danger or both",
        ));
    }
    Ok(())
}
