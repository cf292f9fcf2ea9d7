use once_cell::sync::OnceCell;

/// Global metrics switch, set once by the daemon
static METRICS_ENABLED: OnceCell<bool> = OnceCell::new();

/// Initialize the global metrics switch. Returns false if it was already set.
pub fn init_metrics(enabled: bool) -> bool {
    METRICS_ENABLED.set(enabled).is_ok()
}

/// Check if metrics are recorded
pub fn is_metrics_enabled() -> bool {
    METRICS_ENABLED.get().copied().unwrap_or(true) // Default to enabled if not initialized
}
