pub mod notification;
pub mod payload;
pub mod stats;
pub mod threshold;

use std::fmt;

pub use notification::{GateOutcome, NotificationGate, PendingNotification};
pub use payload::{Payload, PayloadError};
pub use stats::{ExtremumKind, FieldStats, PanelStats};
pub use threshold::{aggregate, classify, Bounds, Severity, Thresholds};

/// Opaque handle to a panel owned by a `PanelManager`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PanelId(u64);

impl PanelId {
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panel-{}", self.0)
    }
}
