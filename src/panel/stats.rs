//! Running per-field statistics for a panel

use std::collections::HashMap;

use super::payload::Payload;

/// Which running extremum a value refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtremumKind {
    Lowest,
    Highest,
}

impl ExtremumKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Lowest => "Lowest",
            Self::Highest => "Highest",
        }
    }
}

/// Current value and extremes seen for one field. All `None` until the first sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldStats {
    pub current: Option<f64>,
    pub lowest: Option<f64>,
    pub highest: Option<f64>,
}

impl FieldStats {
    /// Records a new sample. The first sample seeds both bounds.
    pub fn record(&mut self, value: f64) {
        self.current = Some(value);
        self.lowest = Some(self.lowest.map_or(value, |lowest| lowest.min(value)));
        self.highest = Some(self.highest.map_or(value, |highest| highest.max(value)));
    }

    pub fn extremum(&self, kind: ExtremumKind) -> Option<f64> {
        match kind {
            ExtremumKind::Lowest => self.lowest,
            ExtremumKind::Highest => self.highest,
        }
    }
}

/// Stats for every configured field of one panel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelStats {
    fields: HashMap<String, FieldStats>,
}

impl PanelStats {
    /// Creates empty stats with one entry per configured prop
    pub fn new<'a, I>(props: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self {
            fields: props
                .into_iter()
                .map(|prop| (prop.to_string(), FieldStats::default()))
                .collect(),
        }
    }

    /// Merges a payload. Props without an entry are dropped, so a data source
    /// may add fields without breaking a running panel.
    ///
    /// Returns the props that were updated, in payload order.
    pub fn merge(&mut self, payload: &Payload) -> Vec<String> {
        let mut updated = Vec::new();

        for (prop, value) in payload.iter() {
            if let Some(stats) = self.fields.get_mut(prop) {
                stats.record(value);
                updated.push(prop.to_string());
            }
        }

        updated
    }

    pub fn get(&self, prop: &str) -> Option<&FieldStats> {
        self.fields.get(prop)
    }

    pub fn contains(&self, prop: &str) -> bool {
        self.fields.contains_key(prop)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
