use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "realtime-monitor - live telemetry panels with threshold alerts",
    long_about = "realtime-monitor watches numeric telemetry from HTTP endpoints or WebSockets. \
                  Panels are defined in a YAML configuration file; each one tracks current, \
                  lowest and highest values per field and raises warn/danger alerts when \
                  thresholds are crossed."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the monitor daemon (default behavior)
    Run,
    /// Validate the configuration file and exit
    Check,
}

impl Cli {
    /// The configuration file to load
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .or_else(realtime_monitor::config::default_config_path)
            .unwrap_or_else(|| PathBuf::from("config.yaml"))
    }
}
