//! The scheduler and merger.
//!
//! A [`Bar`] owns a fixed, ordered set of monitors. [`Bar::start`] runs each
//! monitor in a task of its own, plus one merge task that re-joins every
//! slot whenever any of them changes and hands the result to a [`Display`].
//! A monitor failing never stops the bar: its slot freezes at the last
//! fragment it emitted while the others keep updating.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use barline::bar::Bar;
//! use barline::display::{OutputFormat, StdoutDisplay};
//! use barline::sources::clock::{self, ClockConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bar = Bar::builder()
//!     .boxed(clock::monitor(&ClockConfig::default())?)
//!     .separator(" ")
//!     .build();
//!
//! let handle = bar.start(StdoutDisplay::stdout(OutputFormat::Plain));
//! let report = handle
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await;
//! println!("{} monitors stopped", report.monitors.len());
//! # Ok(())
//! # }
//! ```

pub mod slot;

pub use slot::{MonitorId, MonitorStatus, Slot, SlotState, StopReason};

use std::fmt;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::alert::{ErrorSink, Policy};
use crate::display::Display;
use crate::monitor::sink::SettleGuard;
use crate::monitor::{Monitor, MonitorSink};
use crate::render::Fragment;

/// How long shutdown waits for monitors by default.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// One slot's contribution to a rendered line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub monitor: MonitorId,
    pub fragment: Fragment,
}

/// A snapshot of every slot, left to right.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLine {
    segments: Vec<Segment>,
    separator: String,
}

impl StatusLine {
    pub fn new(segments: Vec<Segment>, separator: impl Into<String>) -> Self {
        Self {
            segments,
            separator: separator.into(),
        }
    }

    fn collect(slots: &[Arc<Slot>], separator: &str) -> Self {
        let segments = slots
            .iter()
            .map(|slot| Segment {
                monitor: slot.id().clone(),
                fragment: slot.fragment(),
            })
            .collect();
        Self::new(segments, separator)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// All non-empty fragments joined by the separator. Slots without output
    /// contribute nothing, not even a separator.
    pub fn joined(&self) -> Fragment {
        Fragment::join(
            self.segments
                .iter()
                .filter(|segment| !segment.fragment.is_empty())
                .map(|segment| segment.fragment.clone()),
            &self.separator,
        )
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined().plain())
    }
}

/// A configured, not yet running, set of monitors.
#[derive(Debug)]
pub struct Bar {
    monitors: Vec<Box<dyn Monitor>>,
    separator: String,
    errors: Arc<dyn ErrorSink>,
    grace_period: Duration,
}

impl Bar {
    pub fn builder() -> BarBuilder {
        BarBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Start every monitor and the merge task.
    ///
    /// Must be called from within a tokio runtime. Dropping the returned
    /// handle also cancels everything, but without waiting.
    pub fn start<D>(self, display: D) -> BarHandle
    where
        D: Display + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let changed = Arc::new(Notify::new());

        let slots: Arc<[Arc<Slot>]> = self
            .monitors
            .iter()
            .enumerate()
            .map(|(index, monitor)| {
                Arc::new(Slot::new(
                    MonitorId::new(index, monitor.name()),
                    changed.clone(),
                ))
            })
            .collect();

        let tasks = self
            .monitors
            .into_iter()
            .zip(slots.iter())
            .map(|(monitor, slot)| {
                let sink = MonitorSink::new(slot.clone(), self.errors.clone(), stop_rx.clone());
                let span = info_span!("monitor", id = %slot.id());
                tokio::spawn(supervise(monitor, sink).instrument(span))
            })
            .collect();

        let merger = tokio::spawn(
            merge(
                slots.clone(),
                self.separator.clone(),
                display,
                changed,
                stop_rx,
            )
            .instrument(info_span!("merge")),
        );
        info!(monitors = slots.len(), "bar started");

        BarHandle {
            slots,
            separator: self.separator,
            stop_tx,
            tasks,
            merger: Some(merger),
            grace_period: self.grace_period,
        }
    }
}

/// Builder for [`Bar`].
#[derive(Debug)]
pub struct BarBuilder {
    monitors: Vec<Box<dyn Monitor>>,
    separator: String,
    errors: Option<Arc<dyn ErrorSink>>,
    grace_period: Duration,
}

impl Default for BarBuilder {
    fn default() -> Self {
        Self {
            monitors: Vec::new(),
            separator: " ".to_string(),
            errors: None,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

impl BarBuilder {
    /// Add a monitor to the right of those already added.
    pub fn monitor<M: Monitor + 'static>(self, monitor: M) -> Self {
        self.boxed(Box::new(monitor))
    }

    pub fn boxed(mut self, monitor: Box<dyn Monitor>) -> Self {
        self.monitors.push(monitor);
        self
    }

    /// Text placed between non-empty fragments. Defaults to one space.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Where monitor failures go. Defaults to [`Policy::new`].
    pub fn error_sink<E: ErrorSink + 'static>(mut self, errors: E) -> Self {
        self.errors = Some(Arc::new(errors));
        self
    }

    /// How long shutdown waits for monitors before aborting them.
    pub fn grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn build(self) -> Bar {
        Bar {
            monitors: self.monitors,
            separator: self.separator,
            errors: self.errors.unwrap_or_else(|| Arc::new(Policy::new())),
            grace_period: self.grace_period,
        }
    }
}

async fn supervise(monitor: Box<dyn Monitor>, sink: MonitorSink) {
    // Settles the slot however `run` ends, including panics and aborts.
    let guard = SettleGuard(sink);
    if !guard.0.start() {
        return;
    }
    debug!("monitor started");
    monitor.run(&guard.0).await;
    debug!("monitor returned");
}

async fn merge<D: Display>(
    slots: Arc<[Arc<Slot>]>,
    separator: String,
    mut display: D,
    changed: Arc<Notify>,
    mut stop: watch::Receiver<bool>,
) -> io::Result<()> {
    let mut last: Option<StatusLine> = None;
    loop {
        tokio::select! {
            biased;
            result = stop.changed() => {
                if result.is_err() || *stop.borrow() {
                    break;
                }
                continue;
            }
            _ = changed.notified() => {}
        }

        let line = StatusLine::collect(&slots, &separator);
        if last.as_ref() == Some(&line) {
            continue;
        }
        if let Err(e) = display.show(&line) {
            error!(error = %e, "display failed, no further updates");
            return Err(e);
        }
        last = Some(line);
    }
    debug!("merge task stopped");
    Ok(())
}

/// Final state of one monitor after shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorReport {
    pub id: MonitorId,
    pub status: MonitorStatus,
    /// The monitor ignored cancellation and had to be aborted.
    pub aborted: bool,
}

/// What [`BarHandle::shutdown`] observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub monitors: Vec<MonitorReport>,
    /// Set when the bar ended because the display stopped accepting lines.
    pub display_error: Option<String>,
}

impl ShutdownReport {
    pub fn aborted(&self) -> impl Iterator<Item = &MonitorReport> {
        self.monitors.iter().filter(|m| m.aborted)
    }

    pub fn failed(&self) -> impl Iterator<Item = &MonitorReport> {
        self.monitors
            .iter()
            .filter(|m| matches!(m.status, MonitorStatus::Stopped(StopReason::Failed(_))))
    }
}

/// Control over a running bar.
#[derive(Debug)]
pub struct BarHandle {
    slots: Arc<[Arc<Slot>]>,
    separator: String,
    stop_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    merger: Option<JoinHandle<io::Result<()>>>,
    grace_period: Duration,
}

impl BarHandle {
    /// Current status of every slot, left to right.
    pub fn statuses(&self) -> Vec<(MonitorId, MonitorStatus)> {
        self.slots
            .iter()
            .map(|slot| (slot.id().clone(), slot.status()))
            .collect()
    }

    /// The line as it would be rendered now.
    pub fn line(&self) -> StatusLine {
        StatusLine::collect(&self.slots, &self.separator)
    }

    /// Run until `signal` resolves or the display fails, then shut down.
    pub async fn run_until<F>(mut self, signal: F) -> ShutdownReport
    where
        F: Future<Output = ()>,
    {
        let ended = match self.merger.as_mut() {
            Some(merger) => tokio::select! {
                _ = signal => None,
                result = merger => Some(result),
            },
            None => {
                signal.await;
                None
            }
        };

        let display_error = match ended {
            None => {
                info!("shutdown requested");
                None
            }
            Some(result) => {
                self.merger = None;
                merge_error(result)
            }
        };

        let mut report = self.shutdown().await;
        report.display_error = report.display_error.or(display_error);
        report
    }

    /// Cancel every monitor, wait up to the grace period for them, and stop
    /// the merge task.
    pub async fn shutdown(mut self) -> ShutdownReport {
        self.stop_tx.send_replace(true);
        let deadline = Instant::now() + self.grace_period;

        let tasks = std::mem::take(&mut self.tasks);
        let mut monitors = Vec::with_capacity(tasks.len());
        for (mut task, slot) in tasks.into_iter().zip(self.slots.iter()) {
            let aborted = match time::timeout_at(deadline, &mut task).await {
                Ok(result) => {
                    log_join(slot.id(), result);
                    false
                }
                Err(_) => {
                    warn!(monitor = %slot.id(), "monitor ignored cancellation, aborting");
                    task.abort();
                    let _ = task.await;
                    true
                }
            };
            monitors.push(MonitorReport {
                id: slot.id().clone(),
                status: slot.status(),
                aborted,
            });
        }

        let display_error = match self.merger.take() {
            Some(mut merger) => match time::timeout_at(deadline, &mut merger).await {
                Ok(result) => merge_error(result),
                Err(_) => {
                    warn!("merge task did not stop, aborting");
                    merger.abort();
                    None
                }
            },
            None => None,
        };

        info!(
            monitors = monitors.len(),
            aborted = monitors.iter().filter(|m| m.aborted).count(),
            "bar stopped"
        );
        ShutdownReport {
            monitors,
            display_error,
        }
    }
}

fn log_join(id: &MonitorId, result: Result<(), JoinError>) {
    match result {
        Ok(()) => debug!(monitor = %id, "monitor task finished"),
        Err(e) if e.is_panic() => error!(monitor = %id, "monitor task panicked"),
        Err(e) => debug!(monitor = %id, error = %e, "monitor task cancelled"),
    }
}

fn merge_error(result: Result<io::Result<()>, JoinError>) -> Option<String> {
    match result {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(e) => {
            error!(error = %e, "merge task failed");
            Some(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::ChannelDisplay;
    use crate::monitor::MonitorError;
    use async_trait::async_trait;

    /// Emits its script, one entry per `step`, then idles until cancelled.
    #[derive(Debug)]
    struct Script {
        name: &'static str,
        steps: Vec<Result<&'static str, &'static str>>,
        step: Duration,
    }

    #[async_trait]
    impl Monitor for Script {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(&self, sink: &MonitorSink) {
            for step in &self.steps {
                tokio::select! {
                    _ = sink.cancelled() => return,
                    _ = time::sleep(self.step) => {}
                }
                match step {
                    Ok(text) => sink.emit(Fragment::text(*text)),
                    Err(reason) => {
                        if sink.fail(MonitorError::Connection(reason.to_string())) {
                            return;
                        }
                    }
                }
            }
            sink.cancelled().await;
        }
    }

    /// Never looks at the cancellation signal.
    #[derive(Debug)]
    struct Stubborn;

    #[async_trait]
    impl Monitor for Stubborn {
        fn name(&self) -> &str {
            "stubborn"
        }

        async fn run(&self, _: &MonitorSink) {
            std::future::pending::<()>().await;
        }
    }

    /// Returns immediately without being asked to.
    #[derive(Debug)]
    struct Quitter;

    #[async_trait]
    impl Monitor for Quitter {
        fn name(&self) -> &str {
            "quitter"
        }

        async fn run(&self, sink: &MonitorSink) {
            sink.emit(Fragment::text("bye"));
        }
    }

    fn script(name: &'static str, steps: Vec<Result<&'static str, &'static str>>) -> Script {
        Script {
            name,
            steps,
            step: Duration::from_millis(10),
        }
    }

    #[test]
    fn joined_line_skips_empty_slots() {
        let segment = |i, text: &str| Segment {
            monitor: MonitorId::new(i, "m"),
            fragment: Fragment::text(text),
        };
        let line = StatusLine::new(vec![segment(0, "X"), segment(1, ""), segment(2, "Y")], "|");
        assert_eq!(line.to_string(), "X|Y");
        assert_eq!(StatusLine::default().to_string(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn merges_in_construction_order() {
        let (display, mut lines) = ChannelDisplay::channel();
        let handle = Bar::builder()
            .monitor(script("a", vec![Ok("1")]))
            .monitor(script("b", vec![Ok("2")]))
            .monitor(script("c", vec![Ok("3")]))
            .separator(",")
            .build()
            .start(display);

        lines
            .wait_for(|line| line.as_ref().is_some_and(|l| l.to_string() == "1,2,3"))
            .await
            .unwrap();

        let report = handle.shutdown().await;
        assert_eq!(report.monitors.len(), 3);
        assert!(report
            .monitors
            .iter()
            .all(|m| m.status == MonitorStatus::Stopped(StopReason::Cancelled) && !m.aborted));
    }

    #[tokio::test(start_paused = true)]
    async fn identical_lines_are_not_resent() {
        let (display, mut lines) = ChannelDisplay::channel();
        let handle = Bar::builder()
            .monitor(script("a", vec![Ok("same"), Ok("same"), Ok("same")]))
            .build()
            .start(display);

        lines.changed().await.unwrap();
        assert_eq!(lines.borrow_and_update().as_ref().unwrap().to_string(), "same");
        time::sleep(Duration::from_millis(100)).await;
        assert!(!lines.has_changed().unwrap());

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_return_is_recorded_as_failure() {
        let (display, _lines) = ChannelDisplay::channel();
        let handle = Bar::builder().monitor(Quitter).build().start(display);

        time::sleep(Duration::from_millis(10)).await;
        let statuses = handle.statuses();
        assert_eq!(
            statuses[0].1,
            MonitorStatus::Stopped(StopReason::Failed(MonitorError::Exited.to_string()))
        );
        assert_eq!(handle.line().to_string(), "bye");
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stragglers_are_aborted_after_grace_period() {
        let (display, _lines) = ChannelDisplay::channel();
        let handle = Bar::builder()
            .monitor(Stubborn)
            .monitor(script("ok", vec![Ok("x")]))
            .grace_period(Duration::from_millis(500))
            .build()
            .start(display);
        time::sleep(Duration::from_millis(50)).await;

        let started = Instant::now();
        let report = handle.shutdown().await;

        assert!(started.elapsed() <= Duration::from_millis(600));
        let aborted: Vec<_> = report.aborted().map(|m| m.id.name().to_string()).collect();
        assert_eq!(aborted, vec!["stubborn"]);
        assert_eq!(
            report.monitors[0].status,
            MonitorStatus::Stopped(StopReason::Cancelled)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn display_failure_ends_run_until() {
        let (display, lines) = ChannelDisplay::channel();
        drop(lines);
        let handle = Bar::builder()
            .monitor(script("a", vec![Ok("1")]))
            .build()
            .start(display);

        let report = handle.run_until(std::future::pending()).await;

        assert!(report.display_error.is_some());
        assert_eq!(report.failed().count(), 0);
    }
}
