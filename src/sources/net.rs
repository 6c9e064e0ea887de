//! Network interface link state.

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
pub struct InterfaceConfig {
    /// Interface name, e.g. `wlan0`.
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

impl InterfaceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            period: default_period(),
            root: default_root(),
            base: default_base(),
            rules: default_rules(),
        }
    }
}

fn default_period() -> Duration {
    Duration::from_secs(10)
}

fn default_root() -> PathBuf {
    PathBuf::from("/sys/class/net")
}

fn default_base() -> Option<String> {
    Some("bad".into())
}

fn default_rules() -> Vec<RuleConfig> {
    vec![RuleConfig {
        when: Condition::Equals("up".into()),
        color: "good".into(),
        bold: false,
    }]
}

/// Reads `operstate` for one interface.
#[derive(Debug, Clone)]
pub struct OperState {
    path: PathBuf,
}

impl OperState {
    pub fn new(root: impl Into<PathBuf>, iface: &str) -> Self {
        Self {
            path: root.into().join(iface).join("operstate"),
        }
    }
}

#[async_trait]
impl Probe for OperState {
    type Value = String;

    async fn sample(&self) -> Result<String, MonitorError> {
        read_value(&self.path).await
    }
}

/// The interface name, colored by its link state.
pub fn monitor(config: &InterfaceConfig, palette: &Palette) -> Result<Box<dyn Monitor>, SourceError> {
    let classifier = classifier(config.base.as_deref(), &config.rules, palette)?;
    let label = config.name.clone();
    Ok(Box::new(PollMonitor::new(
        config.name.clone(),
        config.period,
        OperState::new(&config.root, &config.name),
        move |state: String| Fragment::text(label.clone()).styled(classifier.classify_str(&state)),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bar::slot::MonitorStatus;
    use crate::monitor::sink::testing::sink;
    use crate::render::Style;

    fn sysfs(state: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("wg0")).unwrap();
        std::fs::write(dir.path().join("wg0/operstate"), state).unwrap();
        dir
    }

    #[tokio::test]
    async fn reads_operstate() {
        let dir = sysfs("unknown\n");
        let probe = OperState::new(dir.path(), "wg0");
        assert_eq!(probe.sample().await.unwrap(), "unknown");
        assert!(OperState::new(dir.path(), "eth9").sample().await.is_err());
    }

    #[tokio::test]
    async fn colors_name_by_state() {
        let palette = Palette::dark();
        for (state, color) in [("up\n", palette.good), ("down\n", palette.bad)] {
            let dir = sysfs(state);
            let config = InterfaceConfig {
                root: dir.path().to_path_buf(),
                ..InterfaceConfig::new("wg0")
            };
            let monitor = monitor(&config, &palette).unwrap();
            let (sink, slot, stop) = sink("wg0");

            let run = tokio::spawn(async move { monitor.run(&sink).await });
            tokio::time::sleep(Duration::from_millis(100)).await;
            stop.send_replace(true);
            run.await.unwrap();

            let fragment = slot.fragment();
            assert_eq!(fragment.plain(), "wg0");
            assert_eq!(fragment.spans().next().unwrap().1, Style::fg(color));
        }
    }

    #[tokio::test]
    async fn missing_interface_is_transient() {
        let dir = tempfile::tempdir().unwrap();
        let config = InterfaceConfig {
            root: dir.path().to_path_buf(),
            ..InterfaceConfig::new("wlan0")
        };
        let monitor = monitor(&config, &Palette::dark()).unwrap();
        let (sink, slot, stop) = sink("wlan0");

        let run = tokio::spawn(async move { monitor.run(&sink).await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(slot.status(), MonitorStatus::Running);
        assert!(slot.fragment().is_empty());
        stop.send_replace(true);
        run.await.unwrap();
    }

    #[test]
    fn config_defaults() {
        let config: InterfaceConfig = serde_json::from_str(r#"{"name":"wlan0"}"#).unwrap();
        assert_eq!(config, InterfaceConfig::new("wlan0"));
    }
}
