//! End-to-end scenarios through the public API: monitors feeding a bar
//! feeding a display.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use barline::bar::{MonitorStatus, StopReason};
use barline::command::CommandSpec;
use barline::monitor::{MonitorError, PollMonitor, Probe, StreamMonitor};
use barline::{Bar, ChannelDisplay, Classifier, Fragment, Palette, Rule};

/// Counts up from 1 on every sample.
#[derive(Debug, Default)]
struct Counter(AtomicUsize);

#[async_trait]
impl Probe for Counter {
    type Value = usize;

    async fn sample(&self) -> Result<usize, MonitorError> {
        Ok(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Loses its source on the first sample.
#[derive(Debug)]
struct Broken;

#[async_trait]
impl Probe for Broken {
    type Value = usize;

    async fn sample(&self) -> Result<usize, MonitorError> {
        Err(MonitorError::Connection("source vanished".into()))
    }
}

fn counter(name: &'static str, prefix: &'static str) -> PollMonitor<Counter> {
    PollMonitor::new(name, Duration::from_secs(1), Counter::default(), move |n| {
        Fragment::text(format!("{}{}", prefix, n))
    })
}

#[tokio::test(start_paused = true)]
async fn fatal_failure_leaves_neighbours_running() {
    let (display, mut lines) = ChannelDisplay::channel();
    let handle = Bar::builder()
        .monitor(counter("x", "X"))
        .monitor(PollMonitor::new(
            "broken",
            Duration::from_secs(1),
            Broken,
            |n: usize| Fragment::text(n.to_string()),
        ))
        .monitor(counter("y", "Y"))
        .separator("")
        .build()
        .start(display);

    lines
        .wait_for(|line| line.as_ref().is_some_and(|l| l.to_string() == "X1Y1"))
        .await
        .unwrap();

    let statuses = handle.statuses();
    assert!(statuses[0].1.is_running());
    assert_eq!(
        statuses[1].1,
        MonitorStatus::Stopped(StopReason::Failed(
            "connection failed: source vanished".into()
        ))
    );
    assert!(statuses[2].1.is_running());

    // The broken slot stays empty while its neighbours keep ticking.
    lines
        .wait_for(|line| line.as_ref().is_some_and(|l| l.to_string() == "X3Y3"))
        .await
        .unwrap();
    let line = handle.line();
    assert!(line.segments()[1].fragment.is_empty());

    let report = handle.shutdown().await;
    assert_eq!(report.failed().count(), 1);
    assert_eq!(report.aborted().count(), 0);
}

#[tokio::test(start_paused = true)]
async fn classification_flows_into_the_line() {
    let palette = Palette::dark();
    let classifier = Classifier::new(Palette::dark().style(barline::render::NamedColor::Bad))
        .rule(Rule::at_least(3.0, Palette::dark().style(barline::render::NamedColor::Good)));

    let (display, mut lines) = ChannelDisplay::channel();
    let handle = Bar::builder()
        .monitor(PollMonitor::new(
            "level",
            Duration::from_secs(1),
            Counter::default(),
            move |n: usize| Fragment::text(n.to_string()).styled(classifier.classify_int(n as i64)),
        ))
        .build()
        .start(display);

    lines
        .wait_for(|line| line.as_ref().is_some_and(|l| l.to_string() == "1"))
        .await
        .unwrap();
    let first = lines.borrow().clone().unwrap().joined();
    assert_eq!(first.spans().next().unwrap().1.foreground(), Some(palette.bad));

    lines
        .wait_for(|line| line.as_ref().is_some_and(|l| l.to_string() == "3"))
        .await
        .unwrap();
    let third = lines.borrow().clone().unwrap().joined();
    assert_eq!(third.spans().next().unwrap().1.foreground(), Some(palette.good));

    handle.shutdown().await;
}

#[derive(Debug, Deserialize)]
struct Title {
    title: String,
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn cancellation_releases_blocked_stream() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("pid");
    let script = format!(
        r#"echo $$ > {}; echo '{{"title":"editor"}}'; exec sleep 30"#,
        pid_file.display()
    );

    let (display, mut lines) = ChannelDisplay::channel();
    let handle = Bar::builder()
        .monitor(StreamMonitor::new(
            "window",
            CommandSpec::shell(script),
            |t: Title| Fragment::text(t.title),
        ))
        .grace_period(Duration::from_secs(2))
        .build()
        .start(display);

    tokio::time::timeout(
        Duration::from_secs(5),
        lines.wait_for(|line| line.as_ref().is_some_and(|l| l.to_string() == "editor")),
    )
    .await
    .expect("stream should produce a title")
    .unwrap();

    let pid = std::fs::read_to_string(&pid_file).unwrap().trim().to_string();
    let proc_dir = std::path::Path::new("/proc").join(&pid);
    assert!(proc_dir.exists());

    let started = std::time::Instant::now();
    let report = handle.shutdown().await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(report.aborted().count(), 0);
    assert_eq!(
        report.monitors[0].status,
        MonitorStatus::Stopped(StopReason::Cancelled)
    );
    // Killed and reaped, so not even a zombie is left.
    assert!(!proc_dir.exists());
}
