//! Connection events and their bounded history.
//!
//! The monitor emits an event only when state changes meaningfully:
//! online/offline transitions, a large score swing, or stability dropping
//! below the unstable threshold. History is append-only and pruned to a
//! retention window.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::monitor::metrics::QualityMetrics;
use crate::telemetry::NetworkReading;

/// Kind of connection event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionEventKind {
    /// Connectivity restored.
    Online,
    /// Connectivity lost.
    Offline,
    /// Quality score dropped by more than the swing threshold.
    Slow,
    /// Quality score rose by more than the swing threshold.
    Fast,
    /// Stability fell below the unstable threshold.
    Unstable,
}

impl ConnectionEventKind {
    /// Short display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionEventKind::Online => "online",
            ConnectionEventKind::Offline => "offline",
            ConnectionEventKind::Slow => "slow",
            ConnectionEventKind::Fast => "fast",
            ConnectionEventKind::Unstable => "unstable",
        }
    }

    /// Events counted toward intermittent-connection detection.
    pub fn indicates_flakiness(&self) -> bool {
        matches!(
            self,
            ConnectionEventKind::Offline | ConnectionEventKind::Unstable
        )
    }
}

impl fmt::Display for ConnectionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A discrete connection state change.
#[derive(Debug, Clone)]
pub struct ConnectionEvent {
    /// What changed.
    pub kind: ConnectionEventKind,
    /// When the change was observed.
    pub timestamp: Instant,
    /// Reading at the time of the event.
    pub reading: NetworkReading,
    /// Metrics at the time of the event.
    pub metrics: QualityMetrics,
}

/// Append-only event history pruned to a retention window.
#[derive(Debug)]
pub struct EventHistory {
    events: VecDeque<ConnectionEvent>,
    retention: Duration,
}

impl EventHistory {
    /// Create a history with the given retention window.
    pub fn new(retention: Duration) -> Self {
        Self {
            events: VecDeque::new(),
            retention,
        }
    }

    /// Append an event and prune anything outside the retention window.
    pub fn record(&mut self, event: ConnectionEvent) {
        let now = event.timestamp;
        self.events.push_back(event);
        self.prune(now);
    }

    /// Drop events older than the retention window.
    pub fn prune(&mut self, now: Instant) {
        while let Some(front) = self.events.front() {
            if now.duration_since(front.timestamp) > self.retention {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    /// Count events within `window` of `now` matching the predicate.
    pub fn count_recent(
        &self,
        now: Instant,
        window: Duration,
        predicate: impl Fn(&ConnectionEvent) -> bool,
    ) -> usize {
        self.events
            .iter()
            .filter(|e| now.duration_since(e.timestamp) <= window && predicate(e))
            .count()
    }

    /// Events within `window` of `now`, oldest first.
    pub fn recent(&self, now: Instant, window: Duration) -> Vec<ConnectionEvent> {
        self.events
            .iter()
            .filter(|e| now.duration_since(e.timestamp) <= window)
            .cloned()
            .collect()
    }

    /// Total retained events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if no events are retained.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
