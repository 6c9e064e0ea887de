//! The handle a running monitor uses to publish fragments and report errors.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, trace};

use super::MonitorError;
use crate::alert::ErrorSink;
use crate::bar::slot::{MonitorId, Slot, StopReason};
use crate::render::Fragment;

/// Output side of a monitor: `emit` fragments, `fail` on errors.
///
/// Once [`fail`](MonitorSink::fail) has returned `true` the monitor is
/// stopped and every later emission is discarded.
#[derive(Debug, Clone)]
pub struct MonitorSink {
    slot: Arc<Slot>,
    errors: Arc<dyn ErrorSink>,
    shutdown: watch::Receiver<bool>,
}

impl MonitorSink {
    pub(crate) fn new(
        slot: Arc<Slot>,
        errors: Arc<dyn ErrorSink>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            slot,
            errors,
            shutdown,
        }
    }

    pub fn id(&self) -> &MonitorId {
        self.slot.id()
    }

    /// Publish a newly rendered fragment for this monitor.
    pub fn emit(&self, fragment: Fragment) {
        if !self.slot.publish(fragment) {
            trace!(monitor = %self.id(), "discarding emission from inactive monitor");
        }
    }

    /// Report an error. Returns `true` if the monitor must stop.
    pub fn fail(&self, error: MonitorError) -> bool {
        if self.is_stopped() {
            return true;
        }
        let stop = self.errors.report(self.id(), &error);
        if stop {
            self.slot.stop(StopReason::Failed(error.to_string()));
        }
        stop
    }

    pub fn is_stopped(&self) -> bool {
        self.slot.status().is_stopped()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Resolves once process-wide shutdown has been requested.
    pub fn cancelled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut shutdown = self.shutdown.clone();
        async move {
            loop {
                if *shutdown.borrow_and_update() {
                    return;
                }
                if shutdown.changed().await.is_err() {
                    return;
                }
            }
        }
    }

    pub(crate) fn start(&self) -> bool {
        self.slot.start()
    }

    /// Record the terminal state for a monitor whose `run` has ended.
    pub(crate) fn settle(&self) {
        if self.is_stopped() {
            return;
        }
        if self.is_cancelled() {
            debug!(monitor = %self.id(), "monitor cancelled");
            self.slot.stop(StopReason::Cancelled);
        } else if !self.fail(MonitorError::Exited) {
            self.slot.stop(StopReason::Failed(MonitorError::Exited.to_string()));
        }
    }
}

/// Settles the sink when dropped, covering panics and aborted tasks.
pub(crate) struct SettleGuard(pub(crate) MonitorSink);

impl Drop for SettleGuard {
    fn drop(&mut self) {
        self.0.settle();
    }
}


#[cfg(test)]
mod tests {
    use super::testing::sink;
    use super::*;
    use crate::bar::slot::MonitorStatus;

    #[test]
    fn transient_error_keeps_fragment() {
        let (sink, slot, _stop) = sink("battery");
        sink.emit(Fragment::text("B:80"));

        assert!(!sink.fail(MonitorError::acquire("capacity unreadable")));

        assert_eq!(slot.fragment().plain(), "B:80");
        assert!(slot.status().is_running());
    }

    #[test]
    fn fatal_error_stops_once_and_discards_later_emissions() {
        let (sink, slot, _stop) = sink("window");
        sink.emit(Fragment::text("term"));

        assert!(sink.fail(MonitorError::StreamClosed("swaymsg".into())));
        let stopped = slot.status();
        assert!(sink.fail(MonitorError::Decode("late".into())));
        sink.emit(Fragment::text("after"));

        assert_eq!(slot.status(), stopped);
        assert_eq!(
            stopped,
            MonitorStatus::Stopped(StopReason::Failed(
                "stream closed: swaymsg".to_string()
            ))
        );
        assert_eq!(slot.fragment().plain(), "term");
    }

    #[test]
    fn settle_marks_unexpected_exit() {
        let (sink, slot, _stop) = sink("clock");
        sink.settle();
        assert_eq!(
            slot.status(),
            MonitorStatus::Stopped(StopReason::Failed(MonitorError::Exited.to_string()))
        );
    }

    #[test]
    fn settle_after_cancel_records_cancellation() {
        let (sink, slot, stop) = sink("clock");
        stop.send_replace(true);
        drop(SettleGuard(sink));
        assert_eq!(slot.status(), MonitorStatus::Stopped(StopReason::Cancelled));
    }

    #[tokio::test]
    async fn cancelled_resolves_after_shutdown() {
        let (sink, _slot, stop) = sink("load");
        let cancelled = tokio::spawn(sink.cancelled());
        assert!(!sink.is_cancelled());

        stop.send_replace(true);
        tokio::time::timeout(std::time::Duration::from_secs(1), cancelled)
            .await
            .unwrap()
            .unwrap();
        assert!(sink.is_cancelled());
    }
}
