//! Per-monitor failure handling.
//!
//! Every error a monitor reports lands in an [`ErrorSink`], which decides
//! whether the monitor keeps going. The default [`Policy`] follows each
//! error's [`Severity`]: transient errors are logged and the monitor
//! retries; fatal errors are logged, forwarded to an optional [`Notifier`]
//! and stop the monitor.

mod notifier;

pub use notifier::{Alert, Notifier};

use std::fmt::Debug;

use tracing::{error, warn};

use crate::bar::slot::MonitorId;
use crate::monitor::{MonitorError, Severity};

/// Receives failures from running monitors.
pub trait ErrorSink: Send + Sync + Debug {
    /// Handle an error. Returns `true` if the monitor must stop.
    fn report(&self, monitor: &MonitorId, error: &MonitorError) -> bool;
}

/// Severity-driven error policy.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    notifier: Option<Notifier>,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise a notification for every fatal error.
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }
}

impl ErrorSink for Policy {
    fn report(&self, monitor: &MonitorId, err: &MonitorError) -> bool {
        match err.severity() {
            Severity::Transient => {
                warn!(monitor = %monitor, error = %err, "monitor error, retrying");
                false
            }
            Severity::Fatal => {
                error!(monitor = %monitor, error = %err, "monitor failed, slot frozen");
                if let Some(notifier) = &self.notifier {
                    notifier.notify(Alert::new(monitor, err));
                }
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_continue() {
        let policy = Policy::new();
        let id = MonitorId::new(2, "battery");
        assert!(!policy.report(&id, &MonitorError::acquire("no such file")));
        assert!(!policy.report(&id, &MonitorError::query("timeout")));
    }

    #[test]
    fn fatal_errors_stop() {
        let policy = Policy::new();
        let id = MonitorId::new(0, "window");
        assert!(policy.report(&id, &MonitorError::StreamClosed("swaymsg".into())));
        assert!(policy.report(&id, &MonitorError::Exited));
    }

    #[tokio::test]
    async fn fatal_errors_are_forwarded_to_notifier() {
        let (notifier, mut alerts) = Notifier::channel(4);
        let policy = Policy::new().with_notifier(notifier);
        let id = MonitorId::new(1, "systemd");

        policy.report(&id, &MonitorError::acquire("ignored"));
        policy.report(&id, &MonitorError::Connection("bus gone".into()));

        let alert = alerts.recv().await.unwrap();
        assert_eq!(alert.monitor, "systemd#1");
        assert_eq!(alert.message(), "systemd#1: connection failed: bus gone");
        assert!(alerts.try_recv().is_err());
    }
}
