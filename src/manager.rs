//! Owns every panel and drives its connection state machine.
//!
//! Transport tasks never touch panel state. They report `TransportEvent`s over
//! a channel and the manager applies them one at a time through
//! `process_next`/`process_pending`, so each payload is fully merged, classified,
//! rendered and notified before the next event is looked at.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{self, DataSource, FieldSettings, PollSource, Settings, SocketSource};
use crate::constants::render::STATUS_COULD_NOT_RECONNECT;
use crate::constants::socket::NORMAL_CLOSURE;
use crate::error::{MonitorError, Result};
use crate::metrics::PanelMetrics;
use crate::panel::{
    aggregate, ExtremumKind, FieldStats, GateOutcome, NotificationGate, PanelId, PanelStats,
    Payload, Severity,
};
use crate::render::{NotificationHandle, Notifier, Renderer, SeverityTarget};
use crate::transport::poller::Poller;
use crate::transport::socket::{SocketHandle, SocketTask};
use crate::transport::{
    ConnectionState, EventKind, HttpClient, ReconnectPolicy, ReqwestClient, SocketConnector,
    TransportError, TransportEvent, TungsteniteConnector,
};

struct TaskHandle {
    generation: u64,
    task: JoinHandle<()>,
}

impl TaskHandle {
    fn abort(self) {
        self.task.abort();
    }
}

struct PanelRecord {
    settings: Settings,
    stats: PanelStats,
    state: ConnectionState,
    gate: NotificationGate,
    poll: Option<TaskHandle>,
    socket: Option<SocketHandle>,
    retry: Option<TaskHandle>,
}

impl PanelRecord {
    fn new(settings: Settings) -> Self {
        let stats = PanelStats::new(settings.fields.iter().map(|field| field.prop.as_str()));
        Self {
            settings,
            stats,
            state: ConnectionState::Disconnected,
            gate: NotificationGate::new(),
            poll: None,
            socket: None,
            retry: None,
        }
    }

    fn is_current_poll(&self, generation: u64) -> bool {
        self.poll.as_ref().is_some_and(|poll| poll.generation == generation)
    }

    fn is_current_socket(&self, generation: u64) -> bool {
        self.socket
            .as_ref()
            .is_some_and(|socket| socket.generation == generation)
    }

    fn is_current_retry(&self, generation: u64) -> bool {
        self.retry
            .as_ref()
            .is_some_and(|retry| retry.generation == generation)
    }

    fn stop_transports(&mut self) {
        if let Some(poll) = self.poll.take() {
            poll.abort();
        }
        if let Some(retry) = self.retry.take() {
            retry.abort();
        }
        if let Some(socket) = self.socket.take() {
            socket.close(NORMAL_CLOSURE);
        }
    }
}

/// Spawns transport tasks, each tagged with a fresh generation
struct Transports {
    http: Arc<dyn HttpClient>,
    sockets: Arc<dyn SocketConnector>,
    reconnect: ReconnectPolicy,
    events: UnboundedSender<TransportEvent>,
    last_generation: u64,
}

impl Transports {
    fn next_generation(&mut self) -> u64 {
        self.last_generation += 1;
        self.last_generation
    }

    fn start_poller(&mut self, panel: PanelId, source: &PollSource) -> TaskHandle {
        let generation = self.next_generation();
        let task = Poller::new(
            panel,
            generation,
            source.clone(),
            Arc::clone(&self.http),
            self.events.clone(),
        )
        .spawn();

        TaskHandle { generation, task }
    }

    fn open_socket(&mut self, panel: PanelId, source: &SocketSource) -> SocketHandle {
        SocketTask {
            panel,
            generation: self.next_generation(),
            url: source.url.clone(),
            greeting: source.greeting.clone(),
            connector: Arc::clone(&self.sockets),
            events: self.events.clone(),
        }
        .spawn()
    }

    fn start_retry_timer(&mut self, panel: PanelId) -> TaskHandle {
        let generation = self.next_generation();
        let task = self
            .reconnect
            .spawn_timer(panel, generation, self.events.clone());

        TaskHandle { generation, task }
    }
}

/// Creates panels from raw configuration and keeps them fed with live data
pub struct PanelManager {
    panels: HashMap<PanelId, PanelRecord>,
    last_panel: u64,
    renderer: Box<dyn Renderer + Send>,
    notifier: Box<dyn Notifier + Send>,
    transports: Transports,
    events: UnboundedReceiver<TransportEvent>,
}

impl PanelManager {
    /// Creates a manager that polls over reqwest and subscribes over tokio-tungstenite
    pub fn new(renderer: Box<dyn Renderer + Send>, notifier: Box<dyn Notifier + Send>) -> Self {
        Self::with_transports(
            renderer,
            notifier,
            Arc::new(ReqwestClient::new()),
            Arc::new(TungsteniteConnector),
        )
    }

    pub fn with_transports(
        renderer: Box<dyn Renderer + Send>,
        notifier: Box<dyn Notifier + Send>,
        http: Arc<dyn HttpClient>,
        sockets: Arc<dyn SocketConnector>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            panels: HashMap::new(),
            last_panel: 0,
            renderer,
            notifier,
            transports: Transports {
                http,
                sockets,
                reconnect: ReconnectPolicy::default(),
                events: tx,
                last_generation: 0,
            },
            events: rx,
        }
    }

    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.transports.reconnect = policy;
        self
    }

    /// Ids of every open panel, in creation order
    pub fn panel_ids(&self) -> Vec<PanelId> {
        let mut ids: Vec<PanelId> = self.panels.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Validates `raw` and creates a panel. Connects right away unless
    /// `autoConnect` is false.
    pub fn create_panel(&mut self, raw: &Value) -> Result<PanelId> {
        let settings = config::validate(raw)?;

        self.last_panel += 1;
        let panel = PanelId::from_raw(self.last_panel);

        info!(
            "Creating panel '{}' ({}) for {} source {}",
            settings.title,
            panel,
            settings.source.kind(),
            settings.source.url()
        );

        self.renderer.panel_created(panel, &settings);
        let auto_connect = settings.auto_connect;
        let record = PanelRecord::new(settings);
        PanelMetrics::set_connection_state(panel, &record.settings.title, record.state);
        self.panels.insert(panel, record);

        if auto_connect {
            self.connect(panel)?;
        }

        Ok(panel)
    }

    /// Opens the panel's data source. Does nothing unless disconnected.
    pub fn connect(&mut self, panel: PanelId) -> Result<()> {
        let record = lookup(&mut self.panels, panel)?;
        if !record.state.is_disconnected() {
            debug!("Panel '{}' is already {}", record.settings.title, record.state);
            return Ok(());
        }

        match &record.settings.source {
            DataSource::Poll(source) => {
                record.poll = Some(self.transports.start_poller(panel, source));
            }
            DataSource::Socket(source) => {
                record.socket = Some(self.transports.open_socket(panel, source));
            }
        }

        info!(
            "Connecting panel '{}' to {}",
            record.settings.title,
            record.settings.source.url()
        );
        set_state(panel, record, ConnectionState::Connected, self.renderer.as_mut());
        self.renderer.set_status_text(panel, None);

        Ok(())
    }

    /// Stops every transport of the panel and closes its notification.
    /// Safe to call in any state.
    pub fn disconnect(&mut self, panel: PanelId) -> Result<()> {
        let record = lookup(&mut self.panels, panel)?;

        record.stop_transports();
        record.gate.clear(self.notifier.as_mut());

        if !record.state.is_disconnected() {
            info!("Disconnected panel '{}'", record.settings.title);
        }
        set_state(panel, record, ConnectionState::Disconnected, self.renderer.as_mut());
        self.renderer.set_status_text(panel, None);

        Ok(())
    }

    /// Disconnects and discards the panel. The id is unknown afterwards.
    pub fn close(&mut self, panel: PanelId) -> Result<()> {
        self.disconnect(panel)?;

        if let Some(record) = self.panels.remove(&panel) {
            PanelMetrics::remove_panel(panel, &record.settings.title);
            self.renderer.panel_closed(panel);
            info!("Closed panel '{}' ({})", record.settings.title, panel);
        }

        Ok(())
    }

    /// Flips the panel's notifications flag and returns the new value
    pub fn toggle_notifications(&mut self, panel: PanelId) -> Result<bool> {
        let enabled = !lookup(&mut self.panels, panel)?.settings.notifications;
        self.set_notifications_enabled(panel, enabled)?;
        Ok(enabled)
    }

    pub fn set_notifications_enabled(&mut self, panel: PanelId, enabled: bool) -> Result<()> {
        let record = lookup(&mut self.panels, panel)?;
        record.settings.notifications = enabled;

        info!(
            "Notifications {} for panel '{}'",
            if enabled { "enabled" } else { "muted" },
            record.settings.title
        );
        Ok(())
    }

    pub fn connection_state(&self, panel: PanelId) -> Result<ConnectionState> {
        Ok(self.record(panel)?.state)
    }

    pub fn stats(&self, panel: PanelId) -> Result<&PanelStats> {
        Ok(&self.record(panel)?.stats)
    }

    pub fn settings(&self, panel: PanelId) -> Result<&Settings> {
        Ok(&self.record(panel)?.settings)
    }

    /// Merges a payload into the panel's stats without rendering it.
    ///
    /// Returns the updated stats, or `None` for an unknown panel.
    pub fn merge(&mut self, panel: PanelId, payload: &Payload) -> Option<PanelStats> {
        let record = self.panels.get_mut(&panel)?;
        record.stats.merge(payload);
        Some(record.stats.clone())
    }

    /// Frees the notification slot after the user dismissed a notification
    pub fn notification_dismissed(
        &mut self,
        panel: PanelId,
        handle: NotificationHandle,
    ) -> Result<bool> {
        Ok(lookup(&mut self.panels, panel)?.gate.dismissed(handle))
    }

    /// Lets the renderer redraw every panel after a presentation theme change
    pub fn theme_changed(&mut self) {
        for panel in self.panel_ids() {
            self.renderer.on_theme_changed(panel);
        }
    }

    /// Waits for the next transport event and applies it
    pub async fn process_next(&mut self) -> bool {
        match self.events.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Applies every event already queued without waiting. Returns how many.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    fn record(&self, panel: PanelId) -> Result<&PanelRecord> {
        self.panels
            .get(&panel)
            .ok_or(MonitorError::UnknownPanel(panel))
    }

    fn handle_event(&mut self, event: TransportEvent) {
        let TransportEvent {
            panel,
            generation,
            kind,
        } = event;

        if !self.panels.contains_key(&panel) {
            debug!("Dropping event for closed {}", panel);
            return;
        }

        match kind {
            EventKind::Payload(body) => self.on_payload(panel, generation, &body),
            EventKind::PollFailed(e) => self.on_poll_failed(panel, generation, e),
            EventKind::Opened => self.on_opened(panel, generation),
            EventKind::Closed { code } => self.on_closed(panel, generation, code),
            EventKind::RetryTick => self.on_retry_tick(panel, generation),
        }
    }

    fn on_payload(&mut self, panel: PanelId, generation: u64, body: &str) {
        let Some(record) = self.panels.get_mut(&panel) else {
            return;
        };
        if !record.is_current_poll(generation) && !record.is_current_socket(generation) {
            debug!("Ignoring payload from a stale transport of {}", panel);
            return;
        }

        apply_payload(
            panel,
            record,
            body,
            self.renderer.as_mut(),
            self.notifier.as_mut(),
        );
    }

    fn on_poll_failed(&mut self, panel: PanelId, generation: u64, error: TransportError) {
        let Some(record) = self.panels.get_mut(&panel) else {
            return;
        };
        if record.is_current_poll(generation) {
            warn!("Poll failed for panel '{}': {}", record.settings.title, error);
            PanelMetrics::record_poll_failure(panel, &record.settings.title);
        }
    }

    fn on_opened(&mut self, panel: PanelId, generation: u64) {
        let Some(record) = self.panels.get_mut(&panel) else {
            return;
        };
        if !record.is_current_socket(generation) {
            debug!("Ignoring open of a stale socket of {}", panel);
            return;
        }

        match record.state {
            ConnectionState::Reconnecting { .. } => {
                if let Some(retry) = record.retry.take() {
                    retry.abort();
                }
                info!("Panel '{}' reconnected", record.settings.title);
                set_state(panel, record, ConnectionState::Connected, self.renderer.as_mut());
                self.renderer.set_status_text(panel, None);
            }
            _ => info!("Panel '{}' connected", record.settings.title),
        }
    }

    fn on_closed(&mut self, panel: PanelId, generation: u64, code: u16) {
        let Some(record) = self.panels.get_mut(&panel) else {
            return;
        };
        if !record.is_current_socket(generation) {
            debug!("Ignoring close of a stale socket of {}", panel);
            return;
        }

        // the task has already finished
        record.socket = None;

        let abnormal = matches!(
            &record.settings.source,
            DataSource::Socket(source) if source.is_abnormal(code)
        );

        match record.state {
            ConnectionState::Connected if abnormal => {
                warn!(
                    "Panel '{}' lost its connection (code {}), reconnecting",
                    record.settings.title, code
                );
                record.retry = Some(self.transports.start_retry_timer(panel));

                let remaining = self.transports.reconnect.max_attempts;
                set_state(
                    panel,
                    record,
                    ConnectionState::Reconnecting { remaining },
                    self.renderer.as_mut(),
                );
                let status = format!(
                    "Connection lost (code {code}), reconnecting in {}s",
                    self.transports.reconnect.wait.as_secs()
                );
                self.renderer.set_status_text(panel, Some(&status));
            }
            ConnectionState::Connected => {
                info!(
                    "Panel '{}' connection closed (code {})",
                    record.settings.title, code
                );
                set_state(panel, record, ConnectionState::Disconnected, self.renderer.as_mut());
                let status = format!("Connection closed (code {code})");
                self.renderer.set_status_text(panel, Some(&status));
            }
            ConnectionState::Reconnecting { remaining } => {
                debug!(
                    "Reconnect attempt for '{}' failed (code {}), {} left",
                    record.settings.title, code, remaining
                );
            }
            ConnectionState::Disconnected => {}
        }
    }

    fn on_retry_tick(&mut self, panel: PanelId, generation: u64) {
        let Some(record) = self.panels.get_mut(&panel) else {
            return;
        };
        if !record.is_current_retry(generation) {
            debug!("Ignoring retry tick of a stale timer of {}", panel);
            return;
        }
        let ConnectionState::Reconnecting { remaining } = record.state else {
            return;
        };

        if let Some(socket) = record.socket.take() {
            socket.close(NORMAL_CLOSURE);
        }

        if remaining == 0 {
            if let Some(retry) = record.retry.take() {
                retry.abort();
            }
            warn!("Giving up reconnecting panel '{}'", record.settings.title);
            set_state(panel, record, ConnectionState::Disconnected, self.renderer.as_mut());
            self.renderer
                .set_status_text(panel, Some(STATUS_COULD_NOT_RECONNECT));
            return;
        }

        let DataSource::Socket(source) = &record.settings.source else {
            return;
        };
        record.socket = Some(self.transports.open_socket(panel, source));

        let max_attempts = self.transports.reconnect.max_attempts;
        let attempt = max_attempts.saturating_sub(remaining) + 1;
        info!(
            "Reconnecting panel '{}' (attempt {} of {})",
            record.settings.title, attempt, max_attempts
        );
        PanelMetrics::record_reconnect_attempt(panel, &record.settings.title);

        set_state(
            panel,
            record,
            ConnectionState::Reconnecting {
                remaining: remaining - 1,
            },
            self.renderer.as_mut(),
        );
        let status = format!("Reconnecting (attempt {attempt} of {max_attempts})");
        self.renderer.set_status_text(panel, Some(&status));
    }
}

fn lookup(
    panels: &mut HashMap<PanelId, PanelRecord>,
    panel: PanelId,
) -> Result<&mut PanelRecord> {
    panels
        .get_mut(&panel)
        .ok_or(MonitorError::UnknownPanel(panel))
}

fn set_state(
    panel: PanelId,
    record: &mut PanelRecord,
    state: ConnectionState,
    renderer: &mut dyn Renderer,
) {
    record.state = state;
    renderer.set_connection_state(panel, state);
    PanelMetrics::set_connection_state(panel, &record.settings.title, state);
}

/// Decode, merge, classify, render, notify
fn apply_payload(
    panel: PanelId,
    record: &mut PanelRecord,
    body: &str,
    renderer: &mut dyn Renderer,
    notifier: &mut dyn Notifier,
) {
    let PanelRecord {
        settings,
        stats,
        gate,
        ..
    } = record;

    let payload = match Payload::parse(body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Ignoring malformed payload for panel '{}': {}", settings.title, e);
            PanelMetrics::record_payload_error(panel, &settings.title);
            return;
        }
    };

    let updated = stats.merge(&payload);
    if updated.is_empty() {
        debug!("Payload for '{}' carried no configured field", settings.title);
        return;
    }
    debug!("Panel '{}' updated {} field(s)", settings.title, updated.len());
    PanelMetrics::record_payload(panel, &settings.title, settings.source.kind());

    for prop in &updated {
        if let (Some(field), Some(values)) = (settings.field(prop), stats.get(prop)) {
            render_field(panel, field, values, renderer);
        }
    }

    let severity = panel_severity(settings, stats);
    renderer.set_severity(panel, SeverityTarget::TitleBar, severity);
    PanelMetrics::set_severity(panel, &settings.title, severity);

    let outcome = gate.on_severity_change(
        panel,
        settings.notifications,
        severity,
        &settings.title,
        notifier,
    );
    if matches!(outcome, GateOutcome::Raised | GateOutcome::Replaced) {
        PanelMetrics::record_notification(panel, &settings.title, severity);
    }
}

fn render_field(
    panel: PanelId,
    field: &FieldSettings,
    values: &FieldStats,
    renderer: &mut dyn Renderer,
) {
    let prop = field.prop.as_str();

    if let Some(current) = values.current {
        renderer.set_current_value(panel, prop, current);
        renderer.push_graph_sample(panel, prop, current);
        renderer.set_severity(
            panel,
            SeverityTarget::Field(prop),
            field.thresholds.classify(current),
        );
    }

    let mut hidden = Vec::new();
    for (kind, shown) in [
        (ExtremumKind::Lowest, field.show_lowest),
        (ExtremumKind::Highest, field.show_highest),
    ] {
        let Some(value) = values.extremum(kind) else {
            continue;
        };

        if shown {
            renderer.set_extremum(panel, prop, kind, value);
            renderer.set_severity(
                panel,
                SeverityTarget::Extremum(prop, kind),
                field.thresholds.classify(value),
            );
        } else {
            let suffix = field.suffix.as_deref().unwrap_or("");
            hidden.push(format!(
                "{}: {value}{suffix}",
                kind.label().to_lowercase()
            ));
        }
    }

    if !hidden.is_empty() {
        renderer.set_tooltip(panel, prop, &hidden.join(", "));
    }
}

/// Worst current-value severity across fields with thresholds. A field with
/// thresholds but no sample yet counts as normal.
fn panel_severity(settings: &Settings, stats: &PanelStats) -> Severity {
    aggregate(
        settings
            .fields
            .iter()
            .filter(|field| field.thresholds.is_configured())
            .map(|field| {
                stats
                    .get(&field.prop)
                    .and_then(|values| values.current)
                    .map_or(Severity::Normal, |current| {
                        field.thresholds.classify(current)
                    })
            }),
    )
}
