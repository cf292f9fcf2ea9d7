use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::{EventKind, HttpClient, TransportEvent};
use crate::config::PollSource;
use crate::panel::PanelId;

/// Polls a single source at its configured interval.
///
/// The first request goes out one interval after the task starts. Each
/// request is awaited before the next tick, so ticks of one panel never
/// overlap.
pub(crate) struct Poller {
    panel: PanelId,
    generation: u64,
    source: PollSource,
    client: Arc<dyn HttpClient>,
    events: UnboundedSender<TransportEvent>,
}

impl Poller {
    pub(crate) fn new(
        panel: PanelId,
        generation: u64,
        source: PollSource,
        client: Arc<dyn HttpClient>,
        events: UnboundedSender<TransportEvent>,
    ) -> Self {
        Self {
            panel,
            generation,
            source,
            client,
            events,
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let period = self.source.interval;
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Starting poller for {} with {:?} interval",
            self.panel, period
        );

        loop {
            interval.tick().await;

            let kind = match self.client.fetch(&self.source).await {
                Ok(body) => EventKind::Payload(body),
                Err(e) => EventKind::PollFailed(e),
            };

            if self
                .events
                .send(TransportEvent::new(self.panel, self.generation, kind))
                .is_err()
            {
                debug!("Event channel closed, stopping poller for {}", self.panel);
                break;
            }
        }
    }
}
