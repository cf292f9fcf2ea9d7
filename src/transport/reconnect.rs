use std::time::Duration;

use backoff::backoff::{Backoff, Constant};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{EventKind, TransportEvent};
use crate::constants::reconnect::{MAX_ATTEMPTS, WAIT_SECS};
use crate::panel::PanelId;

/// Bounded, fixed-wait reconnection for socket panels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub wait: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(WAIT_SECS),
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    pub fn schedule(&self) -> Constant {
        Constant::new(self.wait)
    }

    /// Spawns a timer that emits a `RetryTick` after every wait until aborted
    pub(crate) fn spawn_timer(
        &self,
        panel: PanelId,
        generation: u64,
        events: UnboundedSender<TransportEvent>,
    ) -> JoinHandle<()> {
        let mut schedule = self.schedule();

        tokio::spawn(async move {
            while let Some(wait) = schedule.next_backoff() {
                tokio::time::sleep(wait).await;

                let tick = TransportEvent::new(panel, generation, EventKind::RetryTick);
                if events.send(tick).is_err() {
                    debug!("Event channel closed, stopping retry timer for {}", panel);
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_default_policy() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.wait, Duration::from_secs(7));
        assert_eq!(policy.max_attempts, 15);

        let mut schedule = policy.schedule();
        for _ in 0..20 {
            assert_eq!(schedule.next_backoff(), Some(Duration::from_secs(7)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_ticks_after_each_wait() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let policy = ReconnectPolicy::default();
        let start = tokio::time::Instant::now();

        let timer = policy.spawn_timer(PanelId::from_raw(1), 4, tx);

        let first = rx.recv().await.unwrap();
        assert!(matches!(first.kind, EventKind::RetryTick));
        assert_eq!(first.generation, 4);
        assert_eq!(start.elapsed(), Duration::from_secs(7));

        rx.recv().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(14));

        timer.abort();
        assert!(rx.recv().await.is_none());
    }
}
