//! Best-effort desktop notifications for fatal monitor errors.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::bar::slot::MonitorId;
use crate::command::CommandSpec;
use crate::monitor::MonitorError;

const QUEUE_DEPTH: usize = 16;
const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// One fatal error, ready to be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub monitor: String,
    pub error: String,
}

impl Alert {
    pub fn new(monitor: &MonitorId, error: &MonitorError) -> Self {
        Self {
            monitor: monitor.to_string(),
            error: error.to_string(),
        }
    }

    pub fn message(&self) -> String {
        format!("{}: {}", self.monitor, self.error)
    }
}

/// Hands alerts to a side task without ever blocking the caller.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::Sender<Alert>,
}

impl Notifier {
    /// A notifier whose alerts are delivered to the returned receiver.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Alert>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }

    /// Spawn a task that runs `command` with the alert message appended as
    /// the last argument, once per alert.
    pub fn spawn(command: CommandSpec) -> (Self, JoinHandle<()>) {
        let (notifier, mut rx) = Self::channel(QUEUE_DEPTH);
        let task = tokio::spawn(async move {
            while let Some(alert) = rx.recv().await {
                deliver(&command, &alert).await;
            }
            debug!("notifier stopped");
        });
        (notifier, task)
    }

    /// Queue an alert. Dropped if the queue is full or the task is gone.
    pub fn notify(&self, alert: Alert) {
        if let Err(e) = self.tx.try_send(alert) {
            debug!(error = %e, "dropping notification");
        }
    }
}

async fn deliver(command: &CommandSpec, alert: &Alert) {
    let mut cmd = command.command();
    // stdout belongs to the display.
    cmd.arg(alert.message())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null());
    let status = match cmd.spawn() {
        Ok(mut child) => match tokio::time::timeout(COMMAND_TIMEOUT, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                warn!(command = %command, "notification command timed out");
                return;
            }
        },
        Err(e) => {
            warn!(command = %command, error = %e, "failed to run notification command");
            return;
        }
    };
    match status {
        Ok(status) if status.success() => debug!(monitor = %alert.monitor, "notification sent"),
        Ok(status) => warn!(command = %command, %status, "notification command failed"),
        Err(e) => warn!(command = %command, error = %e, "failed to wait for notification command"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(n: usize) -> Alert {
        Alert::new(&MonitorId::new(n, "load"), &MonitorError::Exited)
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let (notifier, mut rx) = Notifier::channel(1);
        notifier.notify(alert(0));
        notifier.notify(alert(1));

        assert_eq!(rx.try_recv().unwrap().monitor, "load#0");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_queue_is_ignored() {
        let (notifier, rx) = Notifier::channel(1);
        drop(rx);
        notifier.notify(alert(0));
    }

    #[tokio::test]
    async fn runs_command_with_message_appended() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("alerts");
        let script = format!("printf '%s\\n' \"$0\" >> {}", out.display());
        let (notifier, task) = Notifier::spawn(CommandSpec::shell(&script));

        notifier.notify(alert(3));
        drop(notifier);
        task.await.unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written.trim(), "load#3: monitor exited unexpectedly");
    }

    #[tokio::test]
    async fn missing_command_is_logged_not_propagated() {
        let (notifier, task) =
            Notifier::spawn(CommandSpec::new("/nonexistent/notify", Vec::<String>::new()));
        notifier.notify(alert(0));
        drop(notifier);
        task.await.unwrap();
    }
}
