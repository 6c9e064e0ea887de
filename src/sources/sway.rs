//! Focused window title from sway.
//!
//! Two flavours: [`window_monitor`] follows `swaymsg -t subscribe` and updates
//! on every window event, [`tree_monitor`] polls the whole layout tree.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::SourceError;
use crate::command::CommandSpec;
use crate::config::duration;
use crate::monitor::{Monitor, MonitorError, PollMonitor, Probe, StreamMonitor};
use crate::render::Fragment;

/// A node of the sway layout tree; only what is needed to find focus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub floating_nodes: Vec<Node>,
}

impl Node {
    /// Depth-first search for the focused node.
    pub fn focused(&self) -> Option<&Node> {
        if self.focused {
            return Some(self);
        }
        self.nodes
            .iter()
            .chain(&self.floating_nodes)
            .find_map(Node::focused)
    }

    fn title(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

/// One message of `swaymsg -t subscribe '["window"]'`.
#[derive(Debug, Clone, Deserialize)]
pub struct WindowEvent {
    pub change: String,
    pub container: Node,
}

impl WindowEvent {
    /// Title to show after this event. A closed window leaves the slot
    /// empty until the next focus event arrives.
    pub fn render(self) -> Fragment {
        if self.change == "close" {
            return Fragment::empty();
        }
        Fragment::text(self.container.title())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_subscribe")]
    pub command: CommandSpec,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            command: default_subscribe(),
        }
    }
}

fn default_subscribe() -> CommandSpec {
    CommandSpec::new("swaymsg", ["-t", "subscribe", "-m", "-r", r#"["window"]"#])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowTreeConfig {
    #[serde(default = "default_get_tree")]
    pub command: CommandSpec,
    #[serde(default = "default_period", with = "duration::text")]
    pub period: Duration,
}

impl Default for WindowTreeConfig {
    fn default() -> Self {
        Self {
            command: default_get_tree(),
            period: default_period(),
        }
    }
}

fn default_get_tree() -> CommandSpec {
    CommandSpec::new("swaymsg", ["-t", "get_tree", "-r"])
}

fn default_period() -> Duration {
    Duration::from_secs(1)
}

/// Runs a command printing the layout tree and finds the focused title.
#[derive(Debug, Clone)]
pub struct TreeProbe {
    command: CommandSpec,
}

impl TreeProbe {
    pub fn new(command: CommandSpec) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Probe for TreeProbe {
    type Value = String;

    async fn sample(&self) -> Result<String, MonitorError> {
        let output = self
            .command
            .command()
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| MonitorError::acquire(format!("{}: {}", self.command, e)))?;
        if !output.status.success() {
            return Err(MonitorError::acquire(format!(
                "`{}` exited with {}",
                self.command, output.status
            )));
        }
        let tree: Node = serde_json::from_slice(&output.stdout)
            .map_err(|e| MonitorError::acquire(format!("layout tree: {}", e)))?;
        Ok(tree
            .focused()
            .map(|node| node.title().to_string())
            .unwrap_or_default())
    }
}

pub fn window_monitor(config: &WindowConfig) -> Result<Box<dyn Monitor>, SourceError> {
    Ok(Box::new(StreamMonitor::new(
        "window",
        config.command.clone(),
        WindowEvent::render,
    )))
}

pub fn tree_monitor(config: &WindowTreeConfig) -> Result<Box<dyn Monitor>, SourceError> {
    Ok(Box::new(PollMonitor::new(
        "window",
        config.period,
        TreeProbe::new(config.command.clone()),
        Fragment::text,
    )))
}
