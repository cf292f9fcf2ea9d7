use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_gauge_vec, CounterVec, GaugeVec};

use crate::metrics::config_manager::is_metrics_enabled;
use crate::panel::{PanelId, Severity};
use crate::transport::ConnectionState;

lazy_static! {
    /// Payloads applied to a panel, by panel and transport
    static ref PAYLOADS_TOTAL: CounterVec = register_counter_vec!(
        "realtime_monitor_payloads_total",
        "Total number of payloads applied to panels",
        &["panel", "title", "transport"]
    ).expect("Failed to create payloads_total metric");

    /// Payloads that could not be decoded
    static ref PAYLOAD_ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "realtime_monitor_payload_errors_total",
        "Total number of inbound payloads that failed to decode",
        &["panel", "title"]
    ).expect("Failed to create payload_errors_total metric");

    /// Failed poll requests
    static ref POLL_FAILURES_TOTAL: CounterVec = register_counter_vec!(
        "realtime_monitor_poll_failures_total",
        "Total number of failed poll requests",
        &["panel", "title"]
    ).expect("Failed to create poll_failures_total metric");

    /// Socket reconnect attempts
    static ref RECONNECT_ATTEMPTS_TOTAL: CounterVec = register_counter_vec!(
        "realtime_monitor_reconnect_attempts_total",
        "Total number of socket reconnect attempts",
        &["panel", "title"]
    ).expect("Failed to create reconnect_attempts_total metric");

    /// Connection state (0 = disconnected, 1 = connected, 2 = reconnecting)
    static ref CONNECTION_STATE: GaugeVec = register_gauge_vec!(
        "realtime_monitor_connection_state",
        "Panel connection state (0 = disconnected, 1 = connected, 2 = reconnecting)",
        &["panel", "title"]
    ).expect("Failed to create connection_state metric");

    /// Title-bar severity (0 = none, 1 = normal, 2 = warn, 3 = danger)
    static ref PANEL_SEVERITY: GaugeVec = register_gauge_vec!(
        "realtime_monitor_panel_severity",
        "Panel severity (0 = none, 1 = normal, 2 = warn, 3 = danger)",
        &["panel", "title"]
    ).expect("Failed to create panel_severity metric");

    /// Notifications raised, by severity
    static ref NOTIFICATIONS_TOTAL: CounterVec = register_counter_vec!(
        "realtime_monitor_notifications_total",
        "Total number of threshold notifications raised",
        &["panel", "title", "severity"]
    ).expect("Failed to create notifications_total metric");
}

/// Panel metrics collector. Series are keyed by panel id, with the title as a
/// second label.
pub struct PanelMetrics;

impl PanelMetrics {
    pub fn record_payload(panel: PanelId, title: &str, transport: &str) {
        if !is_metrics_enabled() {
            return;
        }
        PAYLOADS_TOTAL
            .with_label_values(&[panel.to_string().as_str(), title, transport])
            .inc();
    }

    pub fn record_payload_error(panel: PanelId, title: &str) {
        if !is_metrics_enabled() {
            return;
        }
        PAYLOAD_ERRORS_TOTAL
            .with_label_values(&[panel.to_string().as_str(), title])
            .inc();
    }

    pub fn record_poll_failure(panel: PanelId, title: &str) {
        if !is_metrics_enabled() {
            return;
        }
        POLL_FAILURES_TOTAL
            .with_label_values(&[panel.to_string().as_str(), title])
            .inc();
    }

    pub fn record_reconnect_attempt(panel: PanelId, title: &str) {
        if !is_metrics_enabled() {
            return;
        }
        RECONNECT_ATTEMPTS_TOTAL
            .with_label_values(&[panel.to_string().as_str(), title])
            .inc();
    }

    pub fn set_connection_state(panel: PanelId, title: &str, state: ConnectionState) {
        if !is_metrics_enabled() {
            return;
        }
        CONNECTION_STATE
            .with_label_values(&[panel.to_string().as_str(), title])
            .set(state.as_gauge());
    }

    pub fn set_severity(panel: PanelId, title: &str, severity: Severity) {
        if !is_metrics_enabled() {
            return;
        }

        let value = match severity {
            Severity::None => 0.0,
            Severity::Normal => 1.0,
            Severity::Warn => 2.0,
            Severity::Danger => 3.0,
        };
        PANEL_SEVERITY
            .with_label_values(&[panel.to_string().as_str(), title])
            .set(value);
    }

    pub fn record_notification(panel: PanelId, title: &str, severity: Severity) {
        if !is_metrics_enabled() {
            return;
        }
        NOTIFICATIONS_TOTAL
            .with_label_values(&[panel.to_string().as_str(), title, severity.as_str()])
            .inc();
    }

    /// Drops the gauges of a closed panel
    pub fn remove_panel(panel: PanelId, title: &str) {
        if !is_metrics_enabled() {
            return;
        }
        let id = panel.to_string();
        let _ = CONNECTION_STATE.remove_label_values(&[id.as_str(), title]);
        let _ = PANEL_SEVERITY.remove_label_values(&[id.as_str(), title]);
    }
}
