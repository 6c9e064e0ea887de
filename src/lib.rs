//! # barline
//!
//! A status-line generator for i3bar, swaybar and terminals, driven by
//! independently scheduled monitors.
//!
//! Each monitor produces snapshots on its own cadence (a timer, a long-lived
//! subprocess, or an event subscription), classifies them into styled text,
//! and publishes the result into its own slot. A merge task joins the slots
//! into one line whenever any of them changes. A failing monitor freezes its
//! slot; the rest of the bar keeps going.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                              Bar                                │
//! │  ┌──────────┐   ┌────────────┐   ┌──────┐                       │
//! │  │ Monitor  │──▶│ Classifier │──▶│ Slot │──┐                    │
//! │  └────┬─────┘   └────────────┘   └──────┘  │   ┌────────────┐   │
//! │       │ MonitorError                       ├──▶│   merge    │───┼──▶ Display
//! │       ▼                          ┌──────┐  │   └────────────┘   │
//! │  ┌──────────┐        ...  ──────▶│ Slot │──┘                    │
//! │  │ErrorSink │──▶ Notifier        └──────┘                       │
//! │  └──────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`classify`]**: ordered first-match rules mapping values to styles
//! - **[`monitor`]**: the [`Monitor`] trait and its poll, stream and
//!   subscription shapes
//! - **[`bar`]**: scheduling, slot merging and shutdown
//! - **[`alert`]**: error policy and fatal-error notifications
//! - **[`render`]**: fragments, styles, palettes and markup encoders
//! - **[`display`]**: output sinks (plain, ANSI, Pango, i3bar JSON)
//! - **[`sources`]**: built-in monitors (network, battery, load, clocks, sway,
//!   systemd)
//! - **[`config`]**: TOML + environment configuration
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Default layout, Pango markup on stdout
//! barline
//!
//! # swaybar / i3bar protocol with a custom config
//! barline --format i3bar --config ~/.config/barline/config.toml
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use barline::monitor::{MonitorError, PollMonitor, Probe};
//! use barline::{Bar, ChannelDisplay, Classifier, Fragment, Palette, Rule};
//!
//! #[derive(Debug)]
//! struct Temperature;
//!
//! #[async_trait::async_trait]
//! impl Probe for Temperature {
//!     type Value = f64;
//!
//!     async fn sample(&self) -> Result<f64, MonitorError> {
//!         Ok(42.0)
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let palette = Palette::dark();
//! let classifier = Classifier::new(palette.style(barline::render::NamedColor::Good))
//!     .rule(Rule::at_least(80.0, palette.style(barline::render::NamedColor::Bad)));
//!
//! let bar = Bar::builder()
//!     .monitor(PollMonitor::new(
//!         "temp",
//!         Duration::from_secs(5),
//!         Temperature,
//!         move |t: f64| Fragment::text(format!("{:.0}°C", t)).styled(classifier.classify_f64(t)),
//!     ))
//!     .build();
//!
//! let (display, mut lines) = ChannelDisplay::channel();
//! let handle = bar.start(display);
//! lines.changed().await.unwrap();
//! handle.shutdown().await;
//! # });
//! ```

pub mod alert;
pub mod bar;
pub mod classify;
pub mod command;
pub mod config;
pub mod display;
pub mod monitor;
pub mod render;
pub mod sources;

pub use alert::{ErrorSink, Notifier, Policy};
pub use bar::{Bar, BarBuilder, BarHandle, ShutdownReport, StatusLine};
pub use classify::{Classifier, Rule};
pub use display::{ChannelDisplay, Display, OutputFormat, StdoutDisplay};
pub use monitor::{Monitor, MonitorError, MonitorSink};
pub use render::{Fragment, Palette, Style};
