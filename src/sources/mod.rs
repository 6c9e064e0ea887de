//! Built-in monitors for a desktop status line.
//!
//! Each submodule pairs a serde configuration struct with a `monitor`
//! constructor returning a boxed [`Monitor`](crate::monitor::Monitor):
//!
//! | module      | shape        | reads                                      |
//! |-------------|--------------|--------------------------------------------|
//! | [`net`]     | poll         | `/sys/class/net/<iface>/operstate`         |
//! | [`battery`] | poll         | `/sys/class/power_supply/<name>/capacity`  |
//! | [`load`]    | poll         | `/proc/loadavg`                            |
//! | [`clock`]   | poll         | local time, or hours in fixed UTC offsets  |
//! | [`sway`]    | stream, poll | `swaymsg` window events or the tree        |
//! | [`systemd`] | subscription | `gdbus monitor` + `systemctl`              |

pub mod battery;
pub mod clock;
pub mod load;
pub mod net;
pub mod sway;
pub mod systemd;

use std::path::Path;

use thiserror::Error;

use crate::classify::{Classifier, RuleConfig};
use crate::monitor::MonitorError;
use crate::render::{Palette, Style, UnknownColor};

/// Errors building a source from its configuration.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Color(#[from] UnknownColor),

    #[error("invalid time format `{0}`")]
    TimeFormat(String),

    #[error("invalid UTC offset {hours}h for `{label}`")]
    Offset { label: String, hours: f64 },

    #[error("{0} needs at least one {1}")]
    Empty(&'static str, &'static str),
}

/// Build a classifier from a configured base color and rules. No base color
/// leaves unmatched values unstyled.
pub(crate) fn classifier(
    base: Option<&str>,
    rules: &[RuleConfig],
    palette: &Palette,
) -> Result<Classifier, UnknownColor> {
    let base = match base {
        Some(color) => Style::fg(palette.resolve(color)?),
        None => Style::new(),
    };
    Classifier::from_config(base, rules, palette)
}

/// Read a small sysfs/procfs file, trimmed.
pub(crate) async fn read_value(path: &Path) -> Result<String, MonitorError> {
    tokio::fs::read_to_string(path)
        .await
        .map(|raw| raw.trim().to_string())
        .map_err(|e| MonitorError::acquire(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Condition;

    #[test]
    fn classifier_without_base_is_unstyled() {
        let palette = Palette::dark();
        let rules = vec![RuleConfig {
            when: Condition::Equals("up".into()),
            color: "good".into(),
            bold: false,
        }];
        let classifier = classifier(None, &rules, &palette).unwrap();

        assert_eq!(classifier.classify_str("down"), Style::new());
        assert_eq!(classifier.classify_str("up"), Style::fg(palette.good));
    }

    #[test]
    fn classifier_rejects_unknown_base() {
        assert!(classifier(Some("nope"), &[], &Palette::dark()).is_err());
    }

    #[tokio::test]
    async fn read_value_trims_and_names_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("operstate");
        std::fs::write(&path, "up\n").unwrap();
        assert_eq!(read_value(&path).await.unwrap(), "up");

        let missing = dir.path().join("missing");
        let err = read_value(&missing).await.unwrap_err();
        assert!(err.to_string().contains("missing"));
        assert!(!err.is_fatal());
    }
}
