//! Configuration loading.
//!
//! Settings come from an optional TOML file layered under `BARLINE_*`
//! environment variables (`__` separates nested keys):
//!
//! ```toml
//! format = "i3bar"
//! palette = "dark"
//! separator = " "
//! grace_period = "2s"
//!
//! [notify]
//! command = ["notify-send", "-u", "critical", "barline"]
//!
//! [[monitor]]
//! kind = "battery"
//! name = "BAT1"
//! rules = [
//!     { at_least = 50, color = "good" },
//!     { at_least = 15, color = "warn" },
//! ]
//!
//! [[monitor]]
//! kind = "interface"
//! name = "wlan0"
//! ```
//!
//! Without a `[[monitor]]` table the default layout is used.

pub mod duration;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::bar::DEFAULT_GRACE_PERIOD;
use crate::command::CommandSpec;
use crate::display::OutputFormat;
use crate::monitor::Monitor;
use crate::render::{Palette, PaletteChoice};
use crate::sources::battery::{self, BatteryConfig};
use crate::sources::clock::{self, ClockConfig, WorldClockConfig};
use crate::sources::load::{self, LoadConfig};
use crate::sources::net::{self, InterfaceConfig};
use crate::sources::sway::{self, WindowConfig, WindowTreeConfig};
use crate::sources::systemd::{self, SystemdConfig};
use crate::sources::SourceError;

const ENV_PREFIX: &str = "BARLINE";

/// Everything the binary needs to build and run a bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub palette: PaletteChoice,
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_grace_period", with = "duration::text")]
    pub grace_period: Duration,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default = "default_layout", rename = "monitor")]
    pub monitors: Vec<MonitorConfig>,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            palette: PaletteChoice::default(),
            separator: default_separator(),
            grace_period: default_grace_period(),
            notify: NotifyConfig::default(),
            monitors: default_layout(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Run for every fatal monitor error, with the message appended.
    #[serde(default)]
    pub command: Option<CommandSpec>,
}

/// One `[[monitor]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MonitorConfig {
    Interface(InterfaceConfig),
    Battery(BatteryConfig),
    Load(LoadConfig),
    Clock(ClockConfig),
    WorldClock(WorldClockConfig),
    Window(WindowConfig),
    WindowTree(WindowTreeConfig),
    Systemd(SystemdConfig),
}

impl MonitorConfig {
    pub fn build(&self, palette: &Palette) -> Result<Box<dyn Monitor>, SourceError> {
        match self {
            MonitorConfig::Interface(c) => net::monitor(c, palette),
            MonitorConfig::Battery(c) => battery::monitor(c, palette),
            MonitorConfig::Load(c) => load::monitor(c, palette),
            MonitorConfig::Clock(c) => clock::monitor(c),
            MonitorConfig::WorldClock(c) => clock::world_monitor(c, palette),
            MonitorConfig::Window(c) => sway::window_monitor(c),
            MonitorConfig::WindowTree(c) => sway::tree_monitor(c),
            MonitorConfig::Systemd(c) => systemd::monitor(c, palette),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MonitorConfig::Interface(_) => "interface",
            MonitorConfig::Battery(_) => "battery",
            MonitorConfig::Load(_) => "load",
            MonitorConfig::Clock(_) => "clock",
            MonitorConfig::WorldClock(_) => "world_clock",
            MonitorConfig::Window(_) => "window",
            MonitorConfig::WindowTree(_) => "window_tree",
            MonitorConfig::Systemd(_) => "systemd",
        }
    }
}

fn default_separator() -> String {
    " ".into()
}

fn default_grace_period() -> Duration {
    DEFAULT_GRACE_PERIOD
}

/// Window title, clock, battery, load, then the wireless and VPN links.
fn default_layout() -> Vec<MonitorConfig> {
    vec![
        MonitorConfig::Window(WindowConfig::default()),
        MonitorConfig::Clock(ClockConfig::default()),
        MonitorConfig::Battery(BatteryConfig::default()),
        MonitorConfig::Load(LoadConfig::default()),
        MonitorConfig::Interface(InterfaceConfig::new("wlan0")),
        MonitorConfig::Interface(InterfaceConfig::new("wg0")),
    ]
}

impl BarConfig {
    /// `$XDG_CONFIG_HOME/barline/config.toml`, falling back to `~/.config`.
    pub fn default_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
        Some(base.join("barline").join("config.toml"))
    }

    /// Load from `path` (which must exist) or, without one, from the default
    /// location if present. Environment variables override either.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Some(File::from(path).required(true)),
            None => Self::default_path().map(|path| File::from(path).required(false)),
        };
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(file);
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("failed to read configuration")?;
        config
            .try_deserialize()
            .context("invalid configuration")
    }

    /// Parse TOML text, without consulting the environment.
    pub fn from_toml(text: &str) -> Result<Self> {
        Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()
            .context("failed to parse configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }

    /// Build every configured monitor, in order.
    pub fn monitors(&self, palette: &Palette) -> Result<Vec<Box<dyn Monitor>>> {
        self.monitors
            .iter()
            .enumerate()
            .map(|(index, monitor)| {
                monitor
                    .build(palette)
                    .with_context(|| format!("monitor {} ({})", index, monitor.kind()))
            })
            .collect()
    }
}
