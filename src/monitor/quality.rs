//! The quality monitor component.
//!
//! Owns the current network reading and the derived quality estimate,
//! reassesses on a background tick and on every reading change, and emits
//! [`ConnectionEvent`]s to registered listeners when state changes
//! meaningfully.
//!
//! # Shutdown
//!
//! The background tick holds only a weak reference; it exits when the last
//! monitor handle is dropped or when [`destroy`](QualityMonitor::destroy)
//! cancels it explicitly.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::MonitoringConfig;
use crate::events::{ListenerId, ListenerSet};
use crate::monitor::event::{ConnectionEvent, ConnectionEventKind, EventHistory};
use crate::monitor::metrics::{quality_score, QualityMetrics, ScoreWindow};
use crate::monitor::strategy::{AdaptationStrategy, UNSTABLE_STABILITY};
use crate::telemetry::{NetworkReading, TelemetrySource};

/// Score change between consecutive assessments that triggers a
/// fast/slow event.
pub const SCORE_SWING_THRESHOLD: f64 = 0.3;

/// Minimum score for the link to be considered reliable.
pub const RELIABLE_SCORE: f64 = 0.5;

/// Minimum stability for the link to be considered reliable.
pub const RELIABLE_STABILITY: f64 = 0.5;

struct MonitorState {
    online: bool,
    manual_reading: Option<NetworkReading>,
    reading: NetworkReading,
    metrics: QualityMetrics,
    scores: ScoreWindow,
    history: EventHistory,
    last_assessed_score: Option<f64>,
    last_stability: f64,
}

struct MonitorInner {
    telemetry: Arc<dyn TelemetrySource>,
    config: MonitoringConfig,
    state: Mutex<MonitorState>,
    listeners: ListenerSet<ConnectionEvent>,
    cancel: CancellationToken,
}

/// Network quality monitor.
///
/// Cheap to clone; clones share state. Construct inside a Tokio runtime
/// (the assessment tick is spawned at construction).
#[derive(Clone)]
pub struct QualityMonitor {
    inner: Arc<MonitorInner>,
}

impl std::fmt::Debug for QualityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("QualityMonitor")
            .field("online", &state.online)
            .field("score", &state.metrics.score)
            .field("stability", &state.metrics.stability)
            .field("history_len", &state.history.len())
            .finish_non_exhaustive()
    }
}

impl QualityMonitor {
    /// Create a monitor and start its assessment tick.
    ///
    /// An initial assessment runs synchronously so metrics are populated
    /// before the first tick.
    pub fn new(telemetry: Arc<dyn TelemetrySource>, config: MonitoringConfig) -> Self {
        let state = MonitorState {
            online: true,
            manual_reading: None,
            reading: NetworkReading::fallback(),
            metrics: QualityMetrics::unassessed(),
            scores: ScoreWindow::new(config.score_window),
            history: EventHistory::new(config.event_retention),
            last_assessed_score: None,
            last_stability: 1.0,
        };
        let inner = Arc::new(MonitorInner {
            telemetry,
            config,
            state: Mutex::new(state),
            listeners: ListenerSet::new(),
            cancel: CancellationToken::new(),
        });

        let monitor = Self { inner };
        monitor.assess_now();
        monitor.spawn_assessment_task();
        monitor
    }

    /// Create a monitor with default configuration.
    pub fn with_defaults(telemetry: Arc<dyn TelemetrySource>) -> Self {
        Self::new(telemetry, MonitoringConfig::default())
    }

    fn spawn_assessment_task(&self) {
        let weak: Weak<MonitorInner> = Arc::downgrade(&self.inner);
        let cancel = self.inner.cancel.clone();
        let interval = self.inner.config.assessment_interval;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                let Some(inner) = weak.upgrade() else { break };
                Self::assess(&inner);
            }
        });
    }

    /// The reading the monitor is currently basing its estimate on.
    pub fn current_reading(&self) -> NetworkReading {
        self.inner.state.lock().reading
    }

    /// The most recently derived quality metrics.
    pub fn quality_metrics(&self) -> QualityMetrics {
        self.inner.state.lock().metrics
    }

    /// Stability over the recent score window, in [0, 1].
    pub fn connection_stability(&self) -> f64 {
        self.inner.state.lock().metrics.stability
    }

    /// Whether the monitor currently believes the host is online.
    pub fn is_online(&self) -> bool {
        self.inner.state.lock().online
    }

    /// True when the link is online, reasonably fast and steady.
    pub fn is_network_reliable(&self) -> bool {
        let state = self.inner.state.lock();
        state.online
            && state.metrics.score >= RELIABLE_SCORE
            && state.metrics.stability >= RELIABLE_STABILITY
    }

    /// True when offline/unstable events have clustered recently.
    ///
    /// More than the configured threshold of flaky events inside the
    /// intermittent window (defaults: 2 events, 5 minutes).
    pub fn is_intermittent_connection(&self) -> bool {
        let state = self.inner.state.lock();
        let count = state.history.count_recent(
            Instant::now(),
            self.inner.config.intermittent_window,
            |e| e.kind.indicates_flakiness(),
        );
        count > self.inner.config.intermittent_threshold
    }

    /// The coarse behavior recommendation for current conditions.
    pub fn adaptation_strategy(&self) -> AdaptationStrategy {
        let state = self.inner.state.lock();
        AdaptationStrategy::derive(&state.metrics, state.reading.save_data)
    }

    /// Events observed within `window` of now, oldest first.
    pub fn recent_events(&self, window: std::time::Duration) -> Vec<ConnectionEvent> {
        self.inner.state.lock().history.recent(Instant::now(), window)
    }

    /// Register a connection event listener.
    pub fn add_listener(
        &self,
        listener: impl Fn(&ConnectionEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        self.inner.listeners.add(listener)
    }

    /// Remove a previously registered listener.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Override the telemetry reading and reassess immediately.
    ///
    /// The override takes precedence over the telemetry source until the
    /// monitor is destroyed. Intended for hosts that push readings and for
    /// tests.
    pub fn update_reading(&self, reading: NetworkReading) {
        self.inner.state.lock().manual_reading = Some(reading);
        self.assess_now();
    }

    /// Record an online/offline transition pushed by the host.
    ///
    /// Emits an event only on an actual transition.
    pub fn set_online(&self, online: bool) {
        let event = {
            let mut state = self.inner.state.lock();
            if state.online == online {
                None
            } else {
                state.online = online;
                let event = ConnectionEvent {
                    kind: if online {
                        ConnectionEventKind::Online
                    } else {
                        ConnectionEventKind::Offline
                    },
                    timestamp: Instant::now(),
                    reading: state.reading,
                    metrics: state.metrics,
                };
                state.history.record(event.clone());
                Some(event)
            }
        };
        if let Some(event) = event {
            tracing::info!(kind = %event.kind, "connectivity transition");
            self.inner.listeners.notify(&event);
        }
    }

    /// Force an immediate reassessment.
    pub fn assess_now(&self) {
        Self::assess(&self.inner);
    }

    /// Stop the assessment tick. Getters remain usable afterwards.
    pub fn destroy(&self) {
        self.inner.cancel.cancel();
        self.inner.listeners.clear();
    }

    fn assess(inner: &Arc<MonitorInner>) {
        let events = {
            let mut state = inner.state.lock();
            let reading = state
                .manual_reading
                .or_else(|| inner.telemetry.current_reading())
                .unwrap_or_else(NetworkReading::fallback);
            state.reading = reading;

            let score = quality_score(&reading);
            state.scores.push(score);
            let stability = state.scores.stability();
            let metrics = QualityMetrics {
                score,
                stability,
                latency_ms: reading.rtt_ms,
                bandwidth_mbps: reading.downlink_mbps,
                packet_loss: ((1.0 - stability) * 0.1).clamp(0.0, 1.0),
            };
            state.metrics = metrics;

            let now = Instant::now();
            let mut events = Vec::new();
            if let Some(previous) = state.last_assessed_score {
                let delta = score - previous;
                if delta.abs() > SCORE_SWING_THRESHOLD {
                    events.push(ConnectionEvent {
                        kind: if delta > 0.0 {
                            ConnectionEventKind::Fast
                        } else {
                            ConnectionEventKind::Slow
                        },
                        timestamp: now,
                        reading,
                        metrics,
                    });
                }
            }
            if state.last_stability >= UNSTABLE_STABILITY && stability < UNSTABLE_STABILITY {
                events.push(ConnectionEvent {
                    kind: ConnectionEventKind::Unstable,
                    timestamp: now,
                    reading,
                    metrics,
                });
            }
            state.last_assessed_score = Some(score);
            state.last_stability = stability;
            for event in &events {
                state.history.record(event.clone());
            }
            state.history.prune(now);
            events
        };

        for event in &events {
            tracing::debug!(
                kind = %event.kind,
                score = format!("{:.2}", event.metrics.score),
                stability = format!("{:.2}", event.metrics.stability),
                "quality event"
            );
            inner.listeners.notify(event);
        }
    }
}
