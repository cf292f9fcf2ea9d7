//! Application-wide constants
//!
//! This module contains the magic numbers and default values used throughout
//! the crate, making them easy to find and modify.

/// Polling-related constants
pub mod polling {
    /// Poll interval floor (in seconds). A configured interval must be strictly
    /// greater than this to be kept.
    pub const MIN_INTERVAL_SECS: f64 = 3.0;

    /// Header sent with every poll request
    pub const REQUESTED_WITH_HEADER: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");
}

/// WebSocket-related constants
pub mod socket {
    /// Normal closure. Never triggers a reconnect and is the code used when we
    /// close a socket ourselves.
    pub const NORMAL_CLOSURE: u16 = 1000;

    /// Abnormal closure (no close frame received)
    pub const ABNORMAL_CLOSURE: u16 = 1006;

    /// Lowest and highest close codes accepted in configuration
    pub const MIN_CLOSE_CODE: u16 = 1000;
    pub const MAX_CLOSE_CODE: u16 = 4999;

    /// Close codes that trigger reconnection when none are configured
    pub const DEFAULT_ABNORMAL_CLOSE_CODES: &[u16] = &[ABNORMAL_CLOSURE];
}

/// Reconnection-related constants
pub mod reconnect {
    /// Fixed wait between reconnect attempts (in seconds)
    pub const WAIT_SECS: u64 = 7;

    /// Maximum number of reconnect attempts before giving up
    pub const MAX_ATTEMPTS: u32 = 15;
}

/// Rendering-related constants
pub mod render {
    /// Number of samples kept in a rolling graph
    pub const GRAPH_WINDOW: usize = 35;

    /// Status text shown once reconnection has been given up
    pub const STATUS_COULD_NOT_RECONNECT: &str = "Could not reconnect";
}

/// Metrics-related constants
pub mod metrics {
    /// Port for Prometheus metrics server
    pub const METRICS_SERVER_PORT: u16 = 9090;
}
