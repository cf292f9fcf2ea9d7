//! Headless renderer and notifier that report panel state through tracing

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info, warn};

use super::{NotificationHandle, NotificationUnavailable, Notifier, Renderer, SeverityTarget};
use crate::config::Settings;
use crate::constants::render::GRAPH_WINDOW;
use crate::panel::{ExtremumKind, PanelId, Severity};
use crate::transport::ConnectionState;

/// Fixed-size rolling window of graph samples, oldest first
#[derive(Debug, Clone)]
pub struct GraphWindow {
    capacity: usize,
    samples: VecDeque<f64>,
}

impl GraphWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for GraphWindow {
    fn default() -> Self {
        Self::new(GRAPH_WINDOW)
    }
}

#[derive(Debug, Default)]
struct PanelView {
    title: String,
    suffixes: HashMap<String, String>,
    graphs: HashMap<String, GraphWindow>,
    title_bar: Option<Severity>,
    status: Option<String>,
}

/// Renders panels as log lines and keeps a graph window per field
#[derive(Debug, Default)]
pub struct LogRenderer {
    panels: HashMap<PanelId, PanelView>,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self, panel: PanelId, prop: &str) -> Option<&GraphWindow> {
        self.panels.get(&panel)?.graphs.get(prop)
    }

    pub fn title_bar(&self, panel: PanelId) -> Option<Severity> {
        self.panels.get(&panel)?.title_bar
    }

    pub fn status(&self, panel: PanelId) -> Option<&str> {
        self.panels.get(&panel)?.status.as_deref()
    }

    fn title(&self, panel: PanelId) -> String {
        self.panels
            .get(&panel)
            .map(|view| view.title.clone())
            .unwrap_or_else(|| panel.to_string())
    }

    fn display(&self, panel: PanelId, prop: &str, value: f64) -> String {
        let suffix = self
            .panels
            .get(&panel)
            .and_then(|view| view.suffixes.get(prop))
            .map(String::as_str)
            .unwrap_or("");
        format!("{value}{suffix}")
    }
}

impl Renderer for LogRenderer {
    fn panel_created(&mut self, panel: PanelId, settings: &Settings) {
        let view = PanelView {
            title: settings.title.clone(),
            suffixes: settings
                .fields
                .iter()
                .filter_map(|field| Some((field.prop.clone(), field.suffix.clone()?)))
                .collect(),
            graphs: settings
                .fields
                .iter()
                .map(|field| (field.prop.clone(), GraphWindow::default()))
                .collect(),
            ..Default::default()
        };

        info!(
            "Created panel '{}' ({}) with {} field(s){}",
            settings.title,
            panel,
            settings.fields.len(),
            if settings.start_minimized { ", minimized" } else { "" }
        );
        self.panels.insert(panel, view);
    }

    fn set_current_value(&mut self, panel: PanelId, prop: &str, value: f64) {
        debug!(
            "[{}] {} = {}",
            self.title(panel),
            prop,
            self.display(panel, prop, value)
        );
    }

    fn set_extremum(&mut self, panel: PanelId, prop: &str, kind: ExtremumKind, value: f64) {
        debug!(
            "[{}] {} {} = {}",
            self.title(panel),
            prop,
            kind.label(),
            self.display(panel, prop, value)
        );
    }

    fn set_tooltip(&mut self, panel: PanelId, prop: &str, text: &str) {
        debug!("[{}] {} ({})", self.title(panel), prop, text);
    }

    fn set_severity(&mut self, panel: PanelId, target: SeverityTarget<'_>, severity: Severity) {
        match target {
            SeverityTarget::TitleBar => {
                let title = self.title(panel);
                if let Some(view) = self.panels.get_mut(&panel) {
                    if view.title_bar != Some(severity) && severity.is_alert() {
                        warn!("Panel '{}' is now {}", title, severity);
                    }
                    view.title_bar = Some(severity);
                }
            }
            SeverityTarget::Field(prop) if severity.is_alert() => {
                debug!("[{}] {} is {}", self.title(panel), prop, severity);
            }
            _ => {}
        }
    }

    fn push_graph_sample(&mut self, panel: PanelId, prop: &str, value: f64) {
        if let Some(view) = self.panels.get_mut(&panel) {
            view.graphs.entry(prop.to_string()).or_default().push(value);
        }
    }

    fn set_status_text(&mut self, panel: PanelId, text: Option<&str>) {
        let title = self.title(panel);
        if let Some(view) = self.panels.get_mut(&panel) {
            match text {
                Some(text) => info!("[{}] {}", title, text),
                None if view.status.is_some() => debug!("[{}] status cleared", title),
                None => {}
            }
            view.status = text.map(str::to_string);
        }
    }

    fn set_connection_state(&mut self, panel: PanelId, state: ConnectionState) {
        info!("[{}] {}", self.title(panel), state);
    }

    fn on_theme_changed(&mut self, panel: PanelId) {
        debug!("[{}] theme changed, redrawing graphs", self.title(panel));
    }

    fn panel_closed(&mut self, panel: PanelId) {
        if let Some(view) = self.panels.remove(&panel) {
            info!("Closed panel '{}' ({})", view.title, panel);
        }
    }
}

/// Notifier that logs notifications instead of showing them
#[derive(Debug, Default)]
pub struct LogNotifier {
    next_handle: u64,
    open: HashSet<NotificationHandle>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}

impl Notifier for LogNotifier {
    fn raise(
        &mut self,
        panel: PanelId,
        severity: Severity,
        title: &str,
        body: &str,
    ) -> Result<NotificationHandle, NotificationUnavailable> {
        self.next_handle += 1;
        let handle = NotificationHandle(self.next_handle);
        self.open.insert(handle);

        warn!("{} ({}, {}): {}", title, panel, severity, body);
        Ok(handle)
    }

    fn close(&mut self, handle: NotificationHandle) {
        if self.open.remove(&handle) {
            debug!("Closed notification {:?}", handle);
        }
    }
}
