//! Interval-poll monitors.
//!
//! Samples a [`Probe`] on a fixed period. A failed sample is reported and the
//! slot keeps its previous fragment until the next tick succeeds.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use super::{Monitor, MonitorError, MonitorSink, Render};
use crate::render::Fragment;

/// One-shot acquisition of a value from an external source.
#[async_trait]
pub trait Probe: Send + Sync + fmt::Debug {
    type Value: Send;

    async fn sample(&self) -> Result<Self::Value, MonitorError>;
}

/// Polls a probe every `period` and renders each sample.
pub struct PollMonitor<P: Probe> {
    name: String,
    period: Duration,
    probe: P,
    render: Render<P::Value>,
}

impl<P: Probe> PollMonitor<P> {
    pub fn new<F>(name: impl Into<String>, period: Duration, probe: P, render: F) -> Self
    where
        F: Fn(P::Value) -> Fragment + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            period: period.max(Duration::from_millis(1)),
            probe,
            render: Arc::new(render),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl<P: Probe> fmt::Debug for PollMonitor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollMonitor")
            .field("name", &self.name)
            .field("period", &self.period)
            .field("probe", &self.probe)
            .finish()
    }
}

#[async_trait]
impl<P> Monitor for PollMonitor<P>
where
    P: Probe + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, sink: &MonitorSink) {
        let mut ticker = time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let cancelled = sink.cancelled();
        tokio::pin!(cancelled);

        loop {
            let sample = tokio::select! {
                biased;
                _ = &mut cancelled => {
                    debug!(monitor = %sink.id(), "poll cancelled");
                    return;
                }
                sample = async {
                    ticker.tick().await;
                    self.probe.sample().await
                } => sample,
            };

            match sample {
                Ok(value) => sink.emit((self.render)(value)),
                Err(e) => {
                    if sink.fail(e) {
                        return;
                    }
                }
            }
        }
    }
}
