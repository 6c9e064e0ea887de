//! Service-manager health.
//!
//! `gdbus monitor` on each configured bus is the event source: every signal
//! systemd emits prints a line, and each line triggers a re-query of
//! `systemctl is-system-running`. One dot is drawn per bus.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{classifier, SourceError};
use crate::classify::{Classifier, Condition, RuleConfig};
use crate::command::CommandSpec;
use crate::config::duration;
use crate::monitor::{Event, Monitor, MonitorError, Subscribe, Subscribed, SubscriptionMonitor};
use crate::render::{Fragment, Palette};

pub const DOT: &str = "●";

const DESTINATION: &str = "org.freedesktop.systemd1";

/// Which service manager to watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bus {
    System,
    Session,
}

impl Bus {
    /// `gdbus monitor` invocation printing one line per systemd signal.
    pub fn monitor_command(self) -> CommandSpec {
        let bus = match self {
            Bus::System => "--system",
            Bus::Session => "--session",
        };
        CommandSpec::new("gdbus", ["monitor", bus, "--dest", DESTINATION])
    }

    /// `systemctl` invocation printing the manager state.
    pub fn state_command(self) -> CommandSpec {
        match self {
            Bus::System => CommandSpec::new("systemctl", ["is-system-running"]),
            Bus::Session => CommandSpec::new("systemctl", ["--user", "is-system-running"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemdConfig {
    #[serde(default = "default_buses")]
    pub buses: Vec<Bus>,
    #[serde(default = "default_refresh", with = "duration::text")]
    pub refresh: Duration,
    #[serde(default = "default_base")]
    pub base: Option<String>,
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleConfig>,
}

impl Default for SystemdConfig {
    fn default() -> Self {
        Self {
            buses: default_buses(),
            refresh: default_refresh(),
            base: default_base(),
            rules: default_rules(),
        }
    }
}

fn default_buses() -> Vec<Bus> {
    vec![Bus::System, Bus::Session]
}

fn default_refresh() -> Duration {
    Duration::from_secs(10)
}

fn default_base() -> Option<String> {
    Some("bad".into())
}

fn default_rules() -> Vec<RuleConfig> {
    vec![RuleConfig {
        when: Condition::Contains("running".into()),
        color: "good".into(),
        bold: false,
    }]
}

/// A bus and the state its manager reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusState {
    pub bus: Bus,
    pub state: String,
}

/// Event processes for every watched bus.
#[derive(Debug)]
pub struct Watchers {
    children: Vec<Child>,
    readers: Vec<JoinHandle<()>>,
}

/// Subscribes to systemd signals and queries the manager state.
#[derive(Debug, Clone)]
pub struct SystemdWatch {
    buses: Vec<Bus>,
}

impl SystemdWatch {
    pub fn new(buses: Vec<Bus>) -> Self {
        Self { buses }
    }

    async fn query_bus(bus: Bus) -> Result<BusState, MonitorError> {
        let command = bus.state_command();
        // Exits non-zero for any state but "running"; stdout still holds it.
        let output = command
            .command()
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| MonitorError::query(format!("{}: {}", command, e)))?;
        let state = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if state.is_empty() {
            return Err(MonitorError::query(format!(
                "`{}` printed nothing ({})",
                command, output.status
            )));
        }
        Ok(BusState { bus, state })
    }
}

/// Forward one event per output line; report the end of output as a lost
/// connection.
fn forward(
    bus: Bus,
    child: &mut Child,
    tx: mpsc::Sender<Event>,
) -> Result<JoinHandle<()>, MonitorError> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| MonitorError::Connection(format!("{:?} bus: stdout not captured", bus)))?;
    Ok(tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        let end = loop {
            match lines.next_line().await {
                Ok(Some(_)) => {
                    if tx.send(Ok(())).await.is_err() {
                        return;
                    }
                }
                Ok(None) => break format!("{:?} bus monitor exited", bus),
                Err(e) => break format!("{:?} bus monitor: {}", bus, e),
            }
        };
        let _ = tx.send(Err(MonitorError::Connection(end))).await;
    }))
}

#[async_trait]
impl Subscribe for SystemdWatch {
    type Connection = Watchers;
    type State = Vec<BusState>;

    async fn connect(&self) -> Result<Subscribed<Watchers>, MonitorError> {
        let (tx, events) = mpsc::channel(64);
        let mut watchers = Watchers {
            children: Vec::with_capacity(self.buses.len()),
            readers: Vec::with_capacity(self.buses.len()),
        };
        for &bus in &self.buses {
            let command = bus.monitor_command();
            let mut child = command
                .command()
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|e| MonitorError::Connection(format!("{}: {}", command, e)))?;
            watchers.readers.push(forward(bus, &mut child, tx.clone())?);
            watchers.children.push(child);
            debug!(?bus, "watching systemd signals");
        }
        Ok(Subscribed {
            connection: watchers,
            events,
        })
    }

    async fn query(&self, _: &mut Watchers) -> Result<Vec<BusState>, MonitorError> {
        let mut states = Vec::with_capacity(self.buses.len());
        for &bus in &self.buses {
            states.push(Self::query_bus(bus).await?);
        }
        Ok(states)
    }

    async fn close(&self, mut watchers: Watchers) {
        for reader in &watchers.readers {
            reader.abort();
        }
        for child in &mut watchers.children {
            let _ = child.start_kill();
            if let Err(e) = child.wait().await {
                warn!(error = %e, "failed to reap gdbus");
            }
        }
    }
}

/// One dot per bus, colored by its state.
pub fn render(states: &[BusState], classifier: &Classifier) -> Fragment {
    Fragment::join(
        states
            .iter()
            .map(|s| Fragment::text(DOT).styled(classifier.classify_str(&s.state))),
        "",
    )
}

pub fn monitor(config: &SystemdConfig, palette: &Palette) -> Result<Box<dyn Monitor>, SourceError> {
    if config.buses.is_empty() {
        return Err(SourceError::Empty("systemd", "bus"));
    }
    let classifier = classifier(config.base.as_deref(), &config.rules, palette)?;
    Ok(Box::new(SubscriptionMonitor::new(
        "systemd",
        config.refresh,
        SystemdWatch::new(config.buses.clone()),
        move |states: Vec<BusState>| render(&states, &classifier),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Style;

    #[test]
    fn commands_per_bus() {
        assert_eq!(
            Bus::System.monitor_command().to_string(),
            "gdbus monitor --system --dest org.freedesktop.systemd1"
        );
        assert_eq!(
            Bus::Session.state_command().to_string(),
            "systemctl --user is-system-running"
        );
    }

    #[test]
    fn one_dot_per_bus() {
        let palette = Palette::dark();
        let classifier = classifier(Some("bad"), &default_rules(), &palette).unwrap();
        let states = vec![
            BusState {
                bus: Bus::System,
                state: "running".into(),
            },
            BusState {
                bus: Bus::Session,
                state: "degraded".into(),
            },
        ];

        let fragment = render(&states, &classifier);

        assert_eq!(fragment.plain(), "●●");
        let styles: Vec<Style> = fragment.spans().map(|(_, style)| style).collect();
        assert_eq!(styles, vec![Style::fg(palette.good), Style::fg(palette.bad)]);
    }

    #[tokio::test]
    async fn forward_reports_end_of_output() {
        let mut child = CommandSpec::shell("echo a; echo b")
            .command()
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let (tx, mut rx) = mpsc::channel(8);

        let reader = forward(Bus::System, &mut child, tx).unwrap();

        assert!(matches!(rx.recv().await, Some(Ok(()))));
        assert!(matches!(rx.recv().await, Some(Ok(()))));
        assert!(matches!(rx.recv().await, Some(Err(MonitorError::Connection(_)))));
        assert!(rx.recv().await.is_none());
        reader.await.unwrap();
        child.wait().await.unwrap();
    }

    #[test]
    fn rejects_empty_bus_list() {
        let config = SystemdConfig {
            buses: vec![],
            ..SystemdConfig::default()
        };
        assert!(monitor(&config, &Palette::dark()).is_err());
    }
}
