//! System load averages relative to the number of CPUs.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{classifier, read_value, SourceError};
use crate::classify::{Classifier, Condition, RuleConfig};
use crate::config::duration;
use crate::monitor::{Monitor, MonitorError, PollMonitor, Probe};
use crate::render::{Fragment, Palette};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default = "default_period", with = "duration::text")]
    pub period: Duration,
    #[serde(default = "default_path")]
    pub path: PathBuf,
    #[serde(default = "default_base")]
    pub base: Option<String>,
    /// Rules over load as a percentage of available CPUs.
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleConfig>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            period: default_period(),
            path: default_path(),
            base: default_base(),
            rules: default_rules(),
        }
    }
}

fn default_period() -> Duration {
    Duration::from_secs(5)
}

fn default_path() -> PathBuf {
    PathBuf::from("/proc/loadavg")
}

fn default_base() -> Option<String> {
    Some("good".into())
}

fn default_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig {
            when: Condition::Above(50.0),
            color: "bad".into(),
            bold: false,
        },
        RuleConfig {
            when: Condition::Above(25.0),
            color: "warn".into(),
            bold: false,
        },
    ]
}

/// The 1, 5 and 15 minute load averages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadAverage(pub [f64; 3]);

impl LoadAverage {
    /// Parse the first three fields of `/proc/loadavg`.
    pub fn parse(raw: &str) -> Result<Self, MonitorError> {
        let mut loads = [0.0; 3];
        let mut fields = raw.split_whitespace();
        for load in &mut loads {
            let field = fields
                .next()
                .ok_or_else(|| MonitorError::acquire(format!("short loadavg line {:?}", raw)))?;
            *load = field
                .parse()
                .map_err(|e| MonitorError::acquire(format!("loadavg field {:?}: {}", field, e)))?;
        }
        Ok(Self(loads))
    }
}

#[derive(Debug, Clone)]
pub struct LoadAvgFile {
    path: PathBuf,
}

impl LoadAvgFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Probe for LoadAvgFile {
    type Value = LoadAverage;

    async fn sample(&self) -> Result<LoadAverage, MonitorError> {
        LoadAverage::parse(&read_value(&self.path).await?)
    }
}

/// `L:a|b|c` with every average colored on its own.
pub fn render(load: LoadAverage, cpus: usize, classifier: &Classifier) -> Fragment {
    let cpus = cpus.max(1) as f64;
    let averages = load.0.iter().map(|avg| {
        Fragment::text(format!("{:.2}", avg)).styled(classifier.classify_f64(avg / cpus * 100.0))
    });
    Fragment::text("L:").append(Fragment::join(averages, "|"))
}

pub fn monitor(config: &LoadConfig, palette: &Palette) -> Result<Box<dyn Monitor>, SourceError> {
    let classifier = classifier(config.base.as_deref(), &config.rules, palette)?;
    let cpus = thread::available_parallelism().map_or(1, |n| n.get());
    Ok(Box::new(PollMonitor::new(
        "load",
        config.period,
        LoadAvgFile::new(&config.path),
        move |load| render(load, cpus, &classifier),
    )))
}
