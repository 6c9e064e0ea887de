//! Monitor abstraction: independently scheduled producers of fragments.
//!
//! Every monitor implements [`Monitor`]. The bar calls [`Monitor::run`] once,
//! in a task of its own, and the monitor keeps emitting through its
//! [`MonitorSink`] until it fails fatally or shutdown is requested.
//!
//! Three shapes are provided:
//!
//! - [`PollMonitor`]: samples a [`Probe`] on a fixed period
//! - [`StreamMonitor`]: decodes newline-delimited JSON from a long-lived
//!   child process
//! - [`SubscriptionMonitor`]: waits on an event channel from a [`Subscribe`]
//!   connection or a refresh timer, then re-queries state
//!
//! ```text
//!            ┌──────────────┐   snapshot   ┌────────────┐  fragment  ┌──────┐
//!  source ──▶│   Monitor    │─────────────▶│ Classifier │───────────▶│ Slot │
//!            └──────┬───────┘              └────────────┘            └──────┘
//!                   │ MonitorError
//!                   ▼
//!              ErrorSink ── stop? ──▶ terminal state
//! ```

mod error;
pub mod poll;
pub(crate) mod sink;
pub mod stream;
pub mod subscription;

pub use error::{MonitorError, Severity};
pub use poll::{PollMonitor, Probe};
pub use sink::MonitorSink;
pub use stream::StreamMonitor;
pub use subscription::{Event, Subscribe, Subscribed, SubscriptionMonitor};

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::render::Fragment;

/// A producer of fragments for one bar slot.
#[async_trait]
pub trait Monitor: Send + Sync + Debug {
    /// Short name used in logs and in i3bar block names.
    fn name(&self) -> &str;

    /// Run until stopped by a fatal error or by shutdown.
    ///
    /// Implementations must watch [`MonitorSink::cancelled`] at every
    /// suspension point and release external resources before returning.
    async fn run(&self, sink: &MonitorSink);
}

/// Converts a decoded snapshot into a fragment.
pub type Render<T> = Arc<dyn Fn(T) -> Fragment + Send + Sync>;
