//! Process-stream monitors.
//!
//! Starts one long-lived child process and reads newline-delimited JSON from
//! its stdout. Every decoded message is rendered and emitted as soon as it
//! arrives. The process is never restarted: when its output ends or cannot be
//! decoded the monitor reports the error and, normally, stops.

use std::fmt;
use std::marker::PhantomData;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tracing::{debug, info, warn};

use super::{Monitor, MonitorError, MonitorSink, Render};
use crate::command::CommandSpec;
use crate::render::Fragment;

/// A monitor driven by a child process emitting one JSON message per line.
///
/// # Example
///
/// ```no_run
/// use barline::command::CommandSpec;
/// use barline::monitor::StreamMonitor;
/// use barline::render::Fragment;
///
/// let titles = StreamMonitor::new(
///     "title",
///     CommandSpec::shell(r#"echo '{"title": "editor"}'; sleep 60"#),
///     |msg: serde_json::Value| Fragment::text(msg["title"].as_str().unwrap_or_default()),
/// );
/// ```
pub struct StreamMonitor<T> {
    name: String,
    command: CommandSpec,
    render: Render<T>,
    _message: PhantomData<fn() -> T>,
}

impl<T> StreamMonitor<T> {
    pub fn new<F>(name: impl Into<String>, command: CommandSpec, render: F) -> Self
    where
        F: Fn(T) -> Fragment + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            command,
            render: Arc::new(render),
            _message: PhantomData,
        }
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }
}

impl<T> fmt::Debug for StreamMonitor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamMonitor")
            .field("name", &self.name)
            .field("command", &self.command)
            .finish()
    }
}

#[async_trait]
impl<T> Monitor for StreamMonitor<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, sink: &MonitorSink) {
        let mut child = match self
            .command
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                sink.fail(MonitorError::spawn(self.command.program(), e));
                return;
            }
        };
        info!(monitor = %sink.id(), command = %self.command, pid = ?child.id(), "stream started");

        let Some(stdout) = child.stdout.take() else {
            sink.fail(MonitorError::spawn(self.command.program(), "stdout not captured"));
            release(&mut child).await;
            return;
        };

        let mut lines = BufReader::new(stdout).lines();
        let cancelled = sink.cancelled();
        tokio::pin!(cancelled);

        loop {
            let line = tokio::select! {
                biased;
                _ = &mut cancelled => {
                    debug!(monitor = %sink.id(), "stream cancelled");
                    break;
                }
                line = lines.next_line() => line,
            };

            match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<T>(line) {
                        Ok(message) => sink.emit((self.render)(message)),
                        Err(e) => {
                            if sink.fail(MonitorError::Decode(e.to_string())) {
                                break;
                            }
                        }
                    }
                }
                Ok(None) => {
                    sink.fail(MonitorError::StreamClosed(format!(
                        "`{}` closed its output",
                        self.command
                    )));
                    break;
                }
                Err(e) => {
                    sink.fail(MonitorError::Read(e.to_string()));
                    break;
                }
            }
        }

        release(&mut child).await;
    }
}

/// Kill the child (if still alive) and reap it.
async fn release(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "child already gone");
    }
    match child.wait().await {
        Ok(status) => debug!(%status, "stream process reaped"),
        Err(e) => warn!(error = %e, "failed to reap stream process"),
    }
}
