//! Threshold classification and panel severity aggregation

use std::fmt;

use serde::{Deserialize, Serialize};

/// Visual/notification state of a value or a panel.
///
/// Ordered so that `max` picks the worst outcome. `None` means no thresholds
/// are configured at all, which is different from `Normal` ("currently fine").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Normal,
    Warn,
    Danger,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Normal => "normal",
            Self::Warn => "warn",
            Self::Danger => "danger",
        }
    }

    /// Whether this severity can raise a notification
    pub fn is_alert(&self) -> bool {
        matches!(self, Self::Warn | Self::Danger)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Warn/danger levels for one side of a field
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub warn: Option<f64>,
    pub danger: Option<f64>,
}

/// Low- and high-side thresholds of a field
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Thresholds {
    pub low: Option<Bounds>,
    pub high: Option<Bounds>,
}

impl Thresholds {
    pub fn is_configured(&self) -> bool {
        self.low.is_some() || self.high.is_some()
    }

    pub fn classify(&self, value: f64) -> Severity {
        classify(value, self.low.as_ref(), self.high.as_ref())
    }
}

/// Classifies `value` against optional low and high thresholds.
///
/// The field's severity is the worse of the low-side and high-side outcomes.
pub fn classify(value: f64, low: Option<&Bounds>, high: Option<&Bounds>) -> Severity {
    if low.is_none() && high.is_none() {
        return Severity::None;
    }

    let low_side = low.map_or(Severity::Normal, |bounds| {
        check_side(bounds, |level| value <= level)
    });
    let high_side = high.map_or(Severity::Normal, |bounds| {
        check_side(bounds, |level| value >= level)
    });

    low_side.max(high_side)
}

fn check_side(bounds: &Bounds, crossed: impl Fn(f64) -> bool) -> Severity {
    if bounds.danger.is_some_and(&crossed) {
        Severity::Danger
    } else if bounds.warn.is_some_and(&crossed) {
        Severity::Warn
    } else {
        Severity::Normal
    }
}

/// Reduces the severities of a panel's current-value fields to the worst one.
///
/// Yields `None` when no field has thresholds configured.
pub fn aggregate<I>(severities: I) -> Severity
where
    I: IntoIterator<Item = Severity>,
{
    severities
        .into_iter()
        .max()
        .unwrap_or(Severity::None)
}
