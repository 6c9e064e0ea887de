//! Local time, and hour-of-day in a set of fixed UTC offsets.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::{classifier, SourceError};
use crate::classify::{Classifier, Condition, RuleConfig};
use crate::config::duration;
use crate::monitor::{Monitor, MonitorError, PollMonitor, Probe};
use crate::render::{Fragment, Palette};

/// Same layout as `date(1)`.
pub const UNIX_DATE: &str = "%a %b %e %H:%M:%S %Z %Y";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_period", with = "duration::text")]
    pub period: Duration,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            period: default_period(),
        }
    }
}

fn default_format() -> String {
    UNIX_DATE.into()
}

fn default_period() -> Duration {
    Duration::from_secs(1)
}

/// A labelled fixed offset from UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub label: String,
    /// Hours east of UTC; may be fractional.
    pub utc_offset: f64,
}

impl Zone {
    pub fn new(label: impl Into<String>, utc_offset: f64) -> Self {
        Self {
            label: label.into(),
            utc_offset,
        }
    }

    fn offset(&self) -> Result<FixedOffset, SourceError> {
        let seconds = self.utc_offset * 3600.0;
        FixedOffset::east_opt(seconds.round() as i32)
            .filter(|_| seconds.is_finite())
            .ok_or_else(|| SourceError::Offset {
                label: self.label.clone(),
                hours: self.utc_offset,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldClockConfig {
    #[serde(default = "default_zones")]
    pub zones: Vec<Zone>,
    #[serde(default = "default_period", with = "duration::text")]
    pub period: Duration,
    #[serde(default)]
    pub base: Option<String>,
    /// Rules over the hour of day (0-23) in each zone.
    #[serde(default = "default_hour_rules")]
    pub rules: Vec<RuleConfig>,
}

impl Default for WorldClockConfig {
    fn default() -> Self {
        Self {
            zones: default_zones(),
            period: default_period(),
            base: None,
            rules: default_hour_rules(),
        }
    }
}

fn default_zones() -> Vec<Zone> {
    vec![
        Zone::new("SF", -7.0),
        Zone::new("NY", -4.0),
        Zone::new("LN", 0.0),
        Zone::new("BG", 8.0),
    ]
}

/// Dim the hours outside a working day.
fn default_hour_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig {
            when: Condition::Below(9.0),
            color: "dim".into(),
            bold: false,
        },
        RuleConfig {
            when: Condition::AtLeast(18.0),
            color: "dim".into(),
            bold: false,
        },
    ]
}

fn check_format(format: &str) -> Result<(), SourceError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(SourceError::TimeFormat(format.to_string()));
    }
    Ok(())
}

/// The current local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

#[async_trait]
impl Probe for LocalClock {
    type Value = DateTime<Local>;

    async fn sample(&self) -> Result<DateTime<Local>, MonitorError> {
        Ok(Local::now())
    }
}

/// The current UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtcClock;

#[async_trait]
impl Probe for UtcClock {
    type Value = DateTime<Utc>;

    async fn sample(&self) -> Result<DateTime<Utc>, MonitorError> {
        Ok(Utc::now())
    }
}

pub fn monitor(config: &ClockConfig) -> Result<Box<dyn Monitor>, SourceError> {
    check_format(&config.format)?;
    let format = config.format.clone();
    Ok(Box::new(PollMonitor::new(
        "clock",
        config.period,
        LocalClock,
        move |now: DateTime<Local>| {
            let mut text = String::new();
            // Validated above, so formatting cannot fail.
            let _ = write!(text, "{}", now.format(&format));
            Fragment::text(text)
        },
    )))
}

/// `SF:08|NY:11|...` with each hour classified.
pub fn render_zones(now: DateTime<Utc>, zones: &[(String, FixedOffset)], classifier: &Classifier) -> Fragment {
    let parts = zones.iter().map(|(label, offset)| {
        let hour = now.with_timezone(offset).hour();
        Fragment::text(format!("{}:", label)).append(
            Fragment::text(format!("{:02}", hour)).styled(classifier.classify_int(hour.into())),
        )
    });
    Fragment::join(parts, "|")
}

pub fn world_monitor(
    config: &WorldClockConfig,
    palette: &Palette,
) -> Result<Box<dyn Monitor>, SourceError> {
    if config.zones.is_empty() {
        return Err(SourceError::Empty("world_clock", "zone"));
    }
    let classifier = classifier(config.base.as_deref(), &config.rules, palette)?;
    let zones = config
        .zones
        .iter()
        .map(|zone| Ok((zone.label.clone(), zone.offset()?)))
        .collect::<Result<Vec<_>, SourceError>>()?;
    Ok(Box::new(PollMonitor::new(
        "world_clock",
        config.period,
        UtcClock,
        move |now| render_zones(now, &zones, &classifier),
    )))
}
