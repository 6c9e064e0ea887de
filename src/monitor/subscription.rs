//! Subscription monitors.
//!
//! Opens a long-lived connection that delivers change notifications, and
//! re-queries state on every notification or refresh tick. A broken
//! connection is fatal; a failed query is transient and the connection is
//! kept open.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, trace};

use super::{Monitor, MonitorError, MonitorSink, Render};
use crate::render::Fragment;

/// A change notification, or an error from the connection itself.
pub type Event = Result<(), MonitorError>;

/// An open connection and its event channel.
#[derive(Debug)]
pub struct Subscribed<C> {
    pub connection: C,
    pub events: mpsc::Receiver<Event>,
}

/// A source that can be subscribed to and queried.
#[async_trait]
pub trait Subscribe: Send + Sync + fmt::Debug {
    type Connection: Send;
    type State: Send;

    /// Open the connection and start delivering events.
    async fn connect(&self) -> Result<Subscribed<Self::Connection>, MonitorError>;

    /// Read the current state over an open connection.
    async fn query(&self, connection: &mut Self::Connection) -> Result<Self::State, MonitorError>;

    /// Release the connection.
    async fn close(&self, connection: Self::Connection) {
        drop(connection);
    }
}

/// Re-renders a subscribed source on each event and every `refresh`.
pub struct SubscriptionMonitor<S: Subscribe> {
    name: String,
    refresh: Duration,
    source: S,
    render: Render<S::State>,
}

impl<S: Subscribe> SubscriptionMonitor<S> {
    pub fn new<F>(name: impl Into<String>, refresh: Duration, source: S, render: F) -> Self
    where
        F: Fn(S::State) -> Fragment + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            refresh: refresh.max(Duration::from_millis(1)),
            source,
            render: Arc::new(render),
        }
    }
}

impl<S: Subscribe> fmt::Debug for SubscriptionMonitor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionMonitor")
            .field("name", &self.name)
            .field("refresh", &self.refresh)
            .field("source", &self.source)
            .finish()
    }
}

enum Wake {
    Event(Option<Event>),
    Refresh,
}

/// Discard queued notifications so a burst costs one query. Returns the
/// first queued error, if any.
fn drain(events: &mut mpsc::Receiver<Event>) -> Option<MonitorError> {
    loop {
        match events.try_recv() {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => return Some(e),
            Err(_) => return None,
        }
    }
}

#[async_trait]
impl<S> Monitor for SubscriptionMonitor<S>
where
    S: Subscribe + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, sink: &MonitorSink) {
        let cancelled = sink.cancelled();
        tokio::pin!(cancelled);

        let connected = tokio::select! {
            biased;
            _ = &mut cancelled => return,
            connected = self.source.connect() => connected,
        };
        let Subscribed {
            mut connection,
            mut events,
        } = match connected {
            Ok(subscribed) => subscribed,
            Err(e) => {
                sink.fail(e);
                return;
            }
        };
        debug!(monitor = %sink.id(), "subscription open");

        let mut refresh = time::interval(self.refresh);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let wake = tokio::select! {
                biased;
                _ = &mut cancelled => break,
                event = events.recv() => Wake::Event(event),
                _ = refresh.tick() => Wake::Refresh,
            };

            match wake {
                Wake::Event(None) => {
                    sink.fail(MonitorError::Connection("event channel closed".into()));
                    break;
                }
                Wake::Event(Some(Err(e))) => {
                    if sink.fail(e) {
                        break;
                    }
                    continue;
                }
                Wake::Event(Some(Ok(()))) => {
                    trace!(monitor = %sink.id(), "change notification");
                    if let Some(e) = drain(&mut events) {
                        if sink.fail(e) {
                            break;
                        }
                    }
                }
                Wake::Refresh => {}
            }

            let state = tokio::select! {
                biased;
                _ = &mut cancelled => break,
                state = self.source.query(&mut connection) => state,
            };
            match state {
                Ok(state) => sink.emit((self.render)(state)),
                Err(e) => {
                    if sink.fail(e) {
                        break;
                    }
                }
            }
        }

        self.source.close(connection).await;
        debug!(monitor = %sink.id(), "subscription closed");
    }
}
