//! Live telemetry panels fed by HTTP polling or WebSockets.
//!
//! A [`PanelManager`] turns declarative panel configuration into panels, keeps
//! their data sources connected and pushes every update through a
//! [`Renderer`] and a [`Notifier`].

pub mod config;
pub mod constants;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod panel;
pub mod render;
pub mod transport;

pub use error::{MonitorError, Result};
pub use manager::PanelManager;
pub use panel::{PanelId, Severity};
pub use render::{
    LogNotifier, LogRenderer, NotificationHandle, NotificationUnavailable, Notifier, Renderer,
    SeverityTarget,
};
pub use transport::ConnectionState;
