pub mod config_manager;
pub mod panel_metrics;
pub mod server;

pub use config_manager::{init_metrics, is_metrics_enabled};
pub use panel_metrics::PanelMetrics;
pub use server::start_metrics_server;
