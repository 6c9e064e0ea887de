//! Per-monitor state cells owned by the bar.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Notify;

use crate::render::Fragment;

/// Stable identity of a monitor: its position on the bar and its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MonitorId {
    index: usize,
    name: String,
}

impl MonitorId {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }

    /// Left-to-right position on the bar.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.index)
    }
}

/// Lifecycle of a monitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MonitorStatus {
    #[default]
    Idle,
    Running,
    Stopped(StopReason),
}

impl MonitorStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, MonitorStatus::Running)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, MonitorStatus::Stopped(_))
    }
}

/// Why a monitor stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Failed(String),
    Cancelled,
}

/// The latest fragment and status of one monitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotState {
    pub fragment: Option<Fragment>,
    pub status: MonitorStatus,
}

/// Single-writer cell for one monitor.
///
/// Only the owning monitor's task writes; the merge task reads. Lock guards
/// are never held across an await point.
#[derive(Debug)]
pub struct Slot {
    id: MonitorId,
    state: RwLock<SlotState>,
    changed: Arc<Notify>,
}

impl Slot {
    pub(crate) fn new(id: MonitorId, changed: Arc<Notify>) -> Self {
        Self {
            id,
            state: RwLock::new(SlotState::default()),
            changed,
        }
    }

    pub fn id(&self) -> &MonitorId {
        &self.id
    }

    pub fn state(&self) -> SlotState {
        self.state.read().clone()
    }

    pub fn status(&self) -> MonitorStatus {
        self.state.read().status.clone()
    }

    /// Current fragment, empty until the monitor first emits.
    pub fn fragment(&self) -> Fragment {
        self.state.read().fragment.clone().unwrap_or_default()
    }

    /// Replace the fragment. Returns `false` (and changes nothing) unless the
    /// monitor is running.
    pub(crate) fn publish(&self, fragment: Fragment) -> bool {
        {
            let mut state = self.state.write();
            if !state.status.is_running() {
                return false;
            }
            if state.fragment.as_ref() == Some(&fragment) {
                return true;
            }
            state.fragment = Some(fragment);
        }
        self.changed.notify_one();
        true
    }

    /// `Idle → Running`. Returns whether the transition happened.
    pub(crate) fn start(&self) -> bool {
        let mut state = self.state.write();
        if state.status != MonitorStatus::Idle {
            return false;
        }
        state.status = MonitorStatus::Running;
        true
    }

    /// Move to a terminal state. Only the first stop takes effect.
    pub(crate) fn stop(&self, reason: StopReason) -> bool {
        let mut state = self.state.write();
        if state.status.is_stopped() {
            return false;
        }
        state.status = MonitorStatus::Stopped(reason);
        true
    }
}
