//! Presentation collaborators consumed by the panel manager

pub mod log;

use thiserror::Error;

use crate::config::Settings;
use crate::panel::{ExtremumKind, PanelId, Severity};
use crate::transport::ConnectionState;

pub use log::{GraphWindow, LogNotifier, LogRenderer};

/// What a severity colour applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityTarget<'a> {
    /// The current-value display of a field
    Field(&'a str),
    /// The lowest/highest display of a field
    Extremum(&'a str, ExtremumKind),
    /// The panel's title bar
    TitleBar,
}

/// Draws panel state. The manager calls these synchronously while it
/// processes an event, so implementations must not block.
pub trait Renderer {
    fn panel_created(&mut self, _panel: PanelId, _settings: &Settings) {}

    fn set_current_value(&mut self, panel: PanelId, prop: &str, value: f64);

    fn set_extremum(&mut self, panel: PanelId, prop: &str, kind: ExtremumKind, value: f64);

    /// Called instead of `set_extremum` for fields whose extremes are hidden
    fn set_tooltip(&mut self, _panel: PanelId, _prop: &str, _text: &str) {}

    fn set_severity(&mut self, panel: PanelId, target: SeverityTarget<'_>, severity: Severity);

    fn push_graph_sample(&mut self, panel: PanelId, prop: &str, value: f64);

    /// `None` clears the status line
    fn set_status_text(&mut self, panel: PanelId, text: Option<&str>);

    fn set_connection_state(&mut self, _panel: PanelId, _state: ConnectionState) {}

    fn on_theme_changed(&mut self, _panel: PanelId) {}

    fn panel_closed(&mut self, _panel: PanelId) {}
}

/// Handle to a notification raised through a `Notifier`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NotificationUnavailable {
    #[error("notifications are not supported on this host")]
    Unsupported,

    #[error("notifications are not permitted")]
    NotPermitted,
}

/// Raises and closes system notifications
pub trait Notifier {
    fn raise(
        &mut self,
        panel: PanelId,
        severity: Severity,
        title: &str,
        body: &str,
    ) -> Result<NotificationHandle, NotificationUnavailable>;

    fn close(&mut self, handle: NotificationHandle);
}
