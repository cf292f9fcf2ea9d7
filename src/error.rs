use thiserror::Error;

use crate::panel::PanelId;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::parser::ConfigError),

    #[error("Unknown panel: {0}")]
    UnknownPanel(PanelId),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
