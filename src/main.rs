use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use realtime_monitor::config;
use realtime_monitor::metrics::{init_metrics, start_metrics_server};
use realtime_monitor::{LogNotifier, LogRenderer, PanelManager};

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Determine configuration path
    let config_path = cli.config_path();
    info!("Using configuration file: {:?}", config_path);

    // Load and validate configuration
    let config = match config::load_config(&config_path) {
        Ok(cfg) => {
            info!("Configuration loaded successfully");
            cfg
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(anyhow::anyhow!("Configuration error: {}", e));
        }
    };

    if matches!(cli.command, Some(Commands::Check)) {
        info!("Configuration is valid: {} panel(s)", config.panels.len());
        return Ok(());
    }

    init_metrics(config.metrics.enabled);
    if config.metrics.enabled {
        start_metrics_server(config.metrics.port).await?;
    }

    let mut manager = PanelManager::new(Box::new(LogRenderer::new()), Box::new(LogNotifier::new()));
    for panel in &config.panels {
        manager.create_panel(panel)?;
    }

    if manager.panel_ids().is_empty() {
        warn!("No panels configured, nothing to monitor");
        return Ok(());
    }

    info!("Monitoring {} panel(s)...", manager.panel_ids().len());

    loop {
        tokio::select! {
            handled = manager.process_next() => {
                if !handled {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    for panel in manager.panel_ids() {
        manager.close(panel)?;
    }

    Ok(())
}
