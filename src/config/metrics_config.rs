use serde::{Deserialize, Serialize};

use crate::constants::metrics::METRICS_SERVER_PORT;

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics collection and the exposition server
    #[serde(default)]
    pub enabled: bool,

    /// Metrics server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_port(),
        }
    }
}

fn default_port() -> u16 {
    METRICS_SERVER_PORT
}
