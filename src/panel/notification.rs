//! Decides when a panel raises, replaces or clears its threshold notification

use chrono::{DateTime, Local};
use tracing::{debug, info};

use super::threshold::Severity;
use super::PanelId;
use crate::render::{NotificationHandle, Notifier};

/// The notification currently outstanding for a panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingNotification {
    pub severity: Severity,
    pub handle: NotificationHandle,
}

/// What the gate did with a severity change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// A notification was raised with nothing outstanding
    Raised,
    /// A lower-severity notification was closed and a new one raised
    Replaced,
    /// Notifications are muted for the panel
    Muted,
    /// Severity is not an alert, or does not exceed the outstanding one
    Suppressed,
    /// The notifier is unavailable or not permitted
    Unavailable,
}

/// At most one outstanding notification per panel, upgraded only from warn to danger
#[derive(Debug, Default)]
pub struct NotificationGate {
    pending: Option<PendingNotification>,
}

impl NotificationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&PendingNotification> {
        self.pending.as_ref()
    }

    pub fn on_severity_change(
        &mut self,
        panel: PanelId,
        enabled: bool,
        severity: Severity,
        title: &str,
        notifier: &mut dyn Notifier,
    ) -> GateOutcome {
        if !severity.is_alert() {
            return GateOutcome::Suppressed;
        }
        if !enabled {
            return GateOutcome::Muted;
        }

        let replacing = match self.pending {
            None => false,
            Some(pending) if severity > pending.severity => true,
            Some(_) => return GateOutcome::Suppressed,
        };

        if let Some(old) = self.pending.take() {
            debug!(
                "Closing {} notification for {} before raising {}",
                old.severity, panel, severity
            );
            notifier.close(old.handle);
        }

        let (heading, body) = notification_text(severity, title, Local::now());
        match notifier.raise(panel, severity, &heading, &body) {
            Ok(handle) => {
                info!("Raised {} notification for panel '{}'", severity, title);
                self.pending = Some(PendingNotification { severity, handle });
                if replacing {
                    GateOutcome::Replaced
                } else {
                    GateOutcome::Raised
                }
            }
            Err(e) => {
                debug!("Notification for panel '{}' not shown: {}", title, e);
                GateOutcome::Unavailable
            }
        }
    }

    /// Force-closes the outstanding notification, whatever its severity
    pub fn clear(&mut self, notifier: &mut dyn Notifier) -> bool {
        match self.pending.take() {
            Some(pending) => {
                notifier.close(pending.handle);
                true
            }
            None => false,
        }
    }

    /// Frees the slot when the user dismisses the outstanding notification
    pub fn dismissed(&mut self, handle: NotificationHandle) -> bool {
        if self.pending.is_some_and(|pending| pending.handle == handle) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

/// Builds the notification heading and body for a threshold crossing
pub fn notification_text(severity: Severity, title: &str, at: DateTime<Local>) -> (String, String) {
    let (heading, kind) = match severity {
        Severity::Danger => ("Danger:  ", "danger"),
        _ => ("Warning:  ", "warning"),
    };

    (
        format!("{heading}{title}"),
        format!(
            "{title} reached a {kind} threshold on {}",
            at.format("%B %-d, %Y %-I:%M:%S %p")
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::NotificationUnavailable;
    use chrono::TimeZone;

    #[derive(Default)]
    struct RecordingNotifier {
        next: u64,
        raised: Vec<(Severity, String)>,
        closed: Vec<NotificationHandle>,
        unavailable: bool,
    }

    impl Notifier for RecordingNotifier {
        fn raise(
            &mut self,
            _panel: PanelId,
            severity: Severity,
            title: &str,
            _body: &str,
        ) -> Result<NotificationHandle, NotificationUnavailable> {
            if self.unavailable {
                return Err(NotificationUnavailable::NotPermitted);
            }
            self.next += 1;
            self.raised.push((severity, title.to_string()));
            Ok(NotificationHandle(self.next))
        }

        fn close(&mut self, handle: NotificationHandle) {
            self.closed.push(handle);
        }
    }

    const PANEL: PanelId = PanelId::from_raw(1);

    #[test]
    fn test_warn_upgrades_to_danger() {
        let mut gate = NotificationGate::new();
        let mut notifier = RecordingNotifier::default();

        let first = gate.on_severity_change(PANEL, true, Severity::Warn, "Site", &mut notifier);
        let second = gate.on_severity_change(PANEL, true, Severity::Danger, "Site", &mut notifier);

        assert_eq!(first, GateOutcome::Raised);
        assert_eq!(second, GateOutcome::Replaced);
        assert_eq!(notifier.closed, vec![NotificationHandle(1)]);
        assert_eq!(gate.pending().unwrap().severity, Severity::Danger);
        assert_eq!(notifier.raised[1].1, "Danger:  Site");
    }

    #[test]
    fn test_danger_is_never_downgraded() {
        let mut gate = NotificationGate::new();
        let mut notifier = RecordingNotifier::default();

        gate.on_severity_change(PANEL, true, Severity::Danger, "Site", &mut notifier);
        let warn = gate.on_severity_change(PANEL, true, Severity::Warn, "Site", &mut notifier);
        let again = gate.on_severity_change(PANEL, true, Severity::Danger, "Site", &mut notifier);

        assert_eq!(warn, GateOutcome::Suppressed);
        assert_eq!(again, GateOutcome::Suppressed);
        assert_eq!(notifier.raised.len(), 1);
        assert!(notifier.closed.is_empty());
    }

    #[test]
    fn test_muted_and_normal_never_raise() {
        let mut gate = NotificationGate::new();
        let mut notifier = RecordingNotifier::default();

        assert_eq!(
            gate.on_severity_change(PANEL, false, Severity::Danger, "Site", &mut notifier),
            GateOutcome::Muted
        );
        assert_eq!(
            gate.on_severity_change(PANEL, true, Severity::Normal, "Site", &mut notifier),
            GateOutcome::Suppressed
        );
        assert!(notifier.raised.is_empty());
    }

    #[test]
    fn test_unavailable_notifier_is_a_no_op() {
        let mut gate = NotificationGate::new();
        let mut notifier = RecordingNotifier {
            unavailable: true,
            ..Default::default()
        };

        let outcome = gate.on_severity_change(PANEL, true, Severity::Danger, "Site", &mut notifier);
        assert_eq!(outcome, GateOutcome::Unavailable);
        assert!(gate.pending().is_none());
    }

    #[test]
    fn test_clear_and_dismiss() {
        let mut gate = NotificationGate::new();
        let mut notifier = RecordingNotifier::default();

        gate.on_severity_change(PANEL, true, Severity::Warn, "Site", &mut notifier);
        assert!(!gate.dismissed(NotificationHandle(99)));
        assert!(gate.dismissed(NotificationHandle(1)));
        assert!(gate.pending().is_none());

        gate.on_severity_change(PANEL, true, Severity::Warn, "Site", &mut notifier);
        assert!(gate.clear(&mut notifier));
        assert!(!gate.clear(&mut notifier));
        assert_eq!(notifier.closed, vec![NotificationHandle(2)]);
    }

    #[test]
    fn test_notification_text() {
        let at = Local.with_ymd_and_hms(2018, 7, 4, 15, 5, 9).unwrap();
        let (heading, body) = notification_text(Severity::Warn, "GET Demo", at);
        assert_eq!(heading, "Warning:  GET Demo");
        assert_eq!(
            body,
            "GET Demo reached a warning threshold on July 4, 2018 3:05:09 PM"
        );
    }
}
