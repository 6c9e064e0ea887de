//! Battery charge from the kernel's power-supply class.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{classifier, read_value, SourceError};
use crate::classify::{Condition, RuleConfig};
use crate::config::duration;
use crate::monitor::{Monitor, MonitorError, PollMonitor, Probe};
use crate::render::{Fragment, Palette};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_period", with = "duration::text")]
    pub period: Duration,
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_base")]
    pub base: Option<String>,
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleConfig>,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            period: default_period(),
            root: default_root(),
            base: default_base(),
            rules: default_rules(),
        }
    }
}

fn default_name() -> String {
    "BAT0".into()
}

fn default_period() -> Duration {
    Duration::from_secs(5)
}

fn default_root() -> PathBuf {
    PathBuf::from("/sys/class/power_supply")
}

fn default_base() -> Option<String> {
    Some("bad".into())
}

fn default_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig {
            when: Condition::AtLeast(75.0),
            color: "good".into(),
            bold: false,
        },
        RuleConfig {
            when: Condition::AtLeast(25.0),
            color: "warn".into(),
            bold: false,
        },
    ]
}

/// Remaining charge in percent.
#[derive(Debug, Clone)]
pub struct Capacity {
    path: PathBuf,
}

impl Capacity {
    pub fn new(root: impl Into<PathBuf>, battery: &str) -> Self {
        Self {
            path: root.into().join(battery).join("capacity"),
        }
    }
}

#[async_trait]
impl Probe for Capacity {
    type Value = u8;

    async fn sample(&self) -> Result<u8, MonitorError> {
        let raw = read_value(&self.path).await?;
        raw.parse::<u8>()
            .map(|pct| pct.min(100))
            .map_err(|e| MonitorError::acquire(format!("capacity {:?}: {}", raw, e)))
    }
}

/// `B:<pct>`, colored by charge level.
pub fn monitor(config: &BatteryConfig, palette: &Palette) -> Result<Box<dyn Monitor>, SourceError> {
    let classifier = classifier(config.base.as_deref(), &config.rules, palette)?;
    Ok(Box::new(PollMonitor::new(
        "battery",
        config.period,
        Capacity::new(&config.root, &config.name),
        move |pct: u8| {
            Fragment::text(format!("B:{}", pct)).styled(classifier.classify_int(pct.into()))
        },
    )))
}
