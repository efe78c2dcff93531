//! Bandwidth-aware speculative preloader.
//!
//! Accepts hints about resources that will probably be needed soon, queues
//! them by composite score, and drains the queue through a bandwidth budget
//! whenever link conditions allow. Failures are absorbed: a preload that
//! fails or times out is recorded and reported to listeners, never retried
//! and never surfaced as an error.
//!
//! # Self-Tuning
//!
//! The preloader subscribes to the quality monitor's connection events and
//! adjusts itself: offline disables dispatch, online re-enables it, a slow
//! event collapses concurrency to one and a fast event raises it up to
//! [`MAX_PRELOAD_CONCURRENCY`].
//!
//! # Shutdown
//!
//! Spawned fetch and credit-back tasks hold only weak references; they exit
//! quietly once [`destroy`](BandwidthPreloader::destroy) cancels the
//! component or the last handle is dropped.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::{PreloadConfig, MAX_PRELOAD_CONCURRENCY};
use crate::events::{ListenerId, ListenerSet};
use crate::fetch::{FetchError, ResourceFetcher};
use crate::monitor::{ConnectionEventKind, QualityMonitor};
use crate::preload::budget::{BandwidthBudget, BudgetSnapshot};
use crate::preload::queue::PreloadQueue;
use crate::preload::request::PreloadRequest;

/// Runtime-adjustable dispatch policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PreloadStrategy {
    /// Whether the queue drains at all.
    pub enabled: bool,
    /// Cap on concurrently outstanding preload fetches.
    pub max_concurrent_preloads: usize,
    /// Minimum downlink (Mbps) before anything dispatches.
    pub bandwidth_threshold_mbps: f64,
    /// Minimum quality score before anything dispatches.
    pub quality_threshold: f64,
}

impl PreloadStrategy {
    fn from_config(config: &PreloadConfig) -> Self {
        Self {
            enabled: true,
            max_concurrent_preloads: config.max_concurrent_preloads,
            bandwidth_threshold_mbps: config.bandwidth_threshold_mbps,
            quality_threshold: config.quality_threshold,
        }
    }
}

/// Partial update to [`PreloadStrategy`]; `None` fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PreloadStrategyUpdate {
    /// New enabled flag.
    pub enabled: Option<bool>,
    /// New concurrency cap.
    pub max_concurrent_preloads: Option<usize>,
    /// New bandwidth threshold.
    pub bandwidth_threshold_mbps: Option<f64>,
    /// New quality threshold.
    pub quality_threshold: Option<f64>,
}

impl PreloadStrategyUpdate {
    fn apply_to(&self, strategy: &mut PreloadStrategy) {
        if let Some(enabled) = self.enabled {
            strategy.enabled = enabled;
        }
        if let Some(max) = self.max_concurrent_preloads {
            strategy.max_concurrent_preloads = max.max(1);
        }
        if let Some(threshold) = self.bandwidth_threshold_mbps {
            strategy.bandwidth_threshold_mbps = threshold;
        }
        if let Some(threshold) = self.quality_threshold {
            strategy.quality_threshold = threshold;
        }
    }
}

/// Destination for successfully preloaded payloads.
///
/// Typically the connectivity handler's cache; injected so the preloader
/// stays unaware of where payloads end up.
pub trait PreloadSink: Send + Sync {
    /// A preload fetch completed with this payload.
    fn preloaded(&self, request: &PreloadRequest, payload: &Bytes);
}

/// Outcome of one dispatched preload, kept in a bounded rolling history.
#[derive(Debug, Clone, Copy)]
pub struct DispatchRecord {
    /// Whether the fetch delivered a payload.
    pub success: bool,
    /// Payload size in bytes (zero on failure).
    pub bytes: u64,
    /// When the fetch settled.
    pub timestamp: Instant,
}

/// Point-in-time view of the queue and dispatch policy.
#[derive(Debug, Clone)]
pub struct QueueStatus {
    /// Requests waiting in the queue.
    pub queued: usize,
    /// Dispatched fetches not yet settled.
    pub in_flight: usize,
    /// Current dispatch policy.
    pub strategy: PreloadStrategy,
    /// Current budget state.
    pub budget: BudgetSnapshot,
}

/// Cumulative preloader statistics.
#[derive(Debug, Clone)]
pub struct BandwidthStats {
    /// Fetches dispatched since construction.
    pub dispatched: u64,
    /// Fetches that delivered a payload.
    pub succeeded: u64,
    /// Fetches that failed or timed out.
    pub failed: u64,
    /// Requests dropped because their deadline passed while queued.
    pub expired: u64,
    /// Requests cancelled by the caller.
    pub cancelled: u64,
    /// Total payload bytes delivered.
    pub bytes_preloaded: u64,
    /// Success fraction over the rolling dispatch history.
    pub efficiency: f64,
    /// Current budget state.
    pub budget: BudgetSnapshot,
}

#[derive(Debug, Clone)]
struct SettledEvent {
    request: PreloadRequest,
    success: bool,
}

struct PreloaderState {
    strategy: PreloadStrategy,
    queue: PreloadQueue,
    budget: BandwidthBudget,
    in_flight: HashSet<String>,
    cancelled_in_flight: HashSet<String>,
    history: VecDeque<DispatchRecord>,
    dispatched: u64,
    succeeded: u64,
    failed: u64,
    expired: u64,
    cancelled: u64,
    bytes_preloaded: u64,
}

struct PreloaderInner {
    fetcher: Arc<dyn ResourceFetcher>,
    monitor: QualityMonitor,
    config: PreloadConfig,
    state: Mutex<PreloaderState>,
    listeners: ListenerSet<SettledEvent>,
    sink: Mutex<Option<Arc<dyn PreloadSink>>>,
    monitor_listener: Mutex<Option<ListenerId>>,
    cancel: CancellationToken,
}

/// Bandwidth-aware preloader.
///
/// Cheap to clone; clones share state. Construct inside a Tokio runtime.
#[derive(Clone)]
pub struct BandwidthPreloader {
    inner: Arc<PreloaderInner>,
}

impl std::fmt::Debug for BandwidthPreloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("BandwidthPreloader")
            .field("queued", &state.queue.len())
            .field("in_flight", &state.in_flight.len())
            .field("enabled", &state.strategy.enabled)
            .finish_non_exhaustive()
    }
}

impl BandwidthPreloader {
    /// Create a preloader bound to a fetcher and a quality monitor.
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        monitor: QualityMonitor,
        config: PreloadConfig,
    ) -> Self {
        let reading = monitor.current_reading();
        let state = PreloaderState {
            strategy: PreloadStrategy::from_config(&config),
            queue: PreloadQueue::new(),
            budget: BandwidthBudget::new(
                reading.downlink_mbps,
                config.budget_share,
                config.budget_window,
            ),
            in_flight: HashSet::new(),
            cancelled_in_flight: HashSet::new(),
            history: VecDeque::with_capacity(config.dispatch_history),
            dispatched: 0,
            succeeded: 0,
            failed: 0,
            expired: 0,
            cancelled: 0,
            bytes_preloaded: 0,
        };
        let inner = Arc::new(PreloaderInner {
            fetcher,
            monitor,
            config,
            state: Mutex::new(state),
            listeners: ListenerSet::new(),
            sink: Mutex::new(None),
            monitor_listener: Mutex::new(None),
            cancel: CancellationToken::new(),
        });

        let weak = Arc::downgrade(&inner);
        let listener_id = inner.monitor.add_listener(move |event| {
            let Some(inner) = weak.upgrade() else { return };
            Self::on_connection_event(&inner, event.kind);
        });
        *inner.monitor_listener.lock() = Some(listener_id);

        Self { inner }
    }

    /// Route successful preloads into `sink` from now on.
    pub fn set_sink(&self, sink: Arc<dyn PreloadSink>) {
        *self.inner.sink.lock() = Some(sink);
    }

    /// Queue a resource for speculative loading.
    ///
    /// Returns `false` when a request for the same id is already queued or
    /// in flight; at most one live request exists per resource.
    pub fn request_preload(&self, request: PreloadRequest) -> bool {
        let accepted = {
            let mut state = self.inner.state.lock();
            if state.in_flight.contains(&request.resource_id) {
                false
            } else {
                state.queue.push(request)
            }
        };
        if accepted {
            Self::pump(&self.inner);
        }
        accepted
    }

    /// Cancel a pending or in-flight preload.
    ///
    /// A queued request is removed outright. An in-flight fetch cannot be
    /// interrupted; its eventual result is discarded instead. Returns
    /// `false` when no live request exists for the id.
    pub fn cancel_preload(&self, resource_id: &str) -> bool {
        let mut state = self.inner.state.lock();
        if state.queue.remove(resource_id).is_some() {
            state.cancelled += 1;
            return true;
        }
        if state.in_flight.contains(resource_id) {
            state.cancelled_in_flight.insert(resource_id.to_string());
            return true;
        }
        false
    }

    /// Apply a partial policy update and re-evaluate the queue.
    pub fn update_strategy(&self, update: PreloadStrategyUpdate) {
        {
            let mut state = self.inner.state.lock();
            update.apply_to(&mut state.strategy);
        }
        Self::pump(&self.inner);
    }

    /// The current dispatch policy.
    pub fn strategy(&self) -> PreloadStrategy {
        self.inner.state.lock().strategy
    }

    /// Current queue and policy snapshot.
    pub fn queue_status(&self) -> QueueStatus {
        let state = self.inner.state.lock();
        QueueStatus {
            queued: state.queue.len(),
            in_flight: state.in_flight.len(),
            strategy: state.strategy,
            budget: state.budget.snapshot(),
        }
    }

    /// Cumulative statistics.
    pub fn bandwidth_stats(&self) -> BandwidthStats {
        let state = self.inner.state.lock();
        let efficiency = if state.history.is_empty() {
            1.0
        } else {
            state.history.iter().filter(|r| r.success).count() as f64
                / state.history.len() as f64
        };
        BandwidthStats {
            dispatched: state.dispatched,
            succeeded: state.succeeded,
            failed: state.failed,
            expired: state.expired,
            cancelled: state.cancelled,
            bytes_preloaded: state.bytes_preloaded,
            efficiency,
            budget: state.budget.snapshot(),
        }
    }

    /// The rolling dispatch outcome history, oldest first.
    pub fn dispatch_history(&self) -> Vec<DispatchRecord> {
        self.inner.state.lock().history.iter().copied().collect()
    }

    /// Register a listener invoked when a preload settles or expires.
    ///
    /// The flag is `true` only when a payload was delivered.
    pub fn add_listener(
        &self,
        listener: impl Fn(&PreloadRequest, bool) + Send + Sync + 'static,
    ) -> ListenerId {
        self.inner
            .listeners
            .add(move |event: &SettledEvent| listener(&event.request, event.success))
    }

    /// Remove a previously registered listener.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Drop the queue and stop dispatching.
    ///
    /// In-flight fetch results are discarded. Status getters remain usable.
    pub fn destroy(&self) {
        self.inner.cancel.cancel();
        if let Some(id) = self.inner.monitor_listener.lock().take() {
            self.inner.monitor.remove_listener(id);
        }
        {
            let mut state = self.inner.state.lock();
            state.queue.clear();
        }
        self.inner.listeners.clear();
        *self.inner.sink.lock() = None;
    }

    fn on_connection_event(inner: &Arc<PreloaderInner>, kind: ConnectionEventKind) {
        let pump_after = {
            let mut state = inner.state.lock();
            match kind {
                ConnectionEventKind::Offline => {
                    state.strategy.enabled = false;
                    false
                }
                ConnectionEventKind::Online => {
                    state.strategy.enabled = true;
                    true
                }
                ConnectionEventKind::Slow => {
                    state.strategy.max_concurrent_preloads = 1;
                    false
                }
                ConnectionEventKind::Fast => {
                    state.strategy.max_concurrent_preloads = (state
                        .strategy
                        .max_concurrent_preloads
                        + 1)
                        .min(MAX_PRELOAD_CONCURRENCY);
                    true
                }
                ConnectionEventKind::Unstable => false,
            }
        };
        tracing::debug!(kind = %kind, "preloader retuned on connection event");
        if pump_after {
            Self::pump(inner);
        }
    }

    /// Drain the queue as far as current conditions allow.
    ///
    /// Monitor snapshots are taken before the state lock; the monitor has
    /// its own lock and must never be called while ours is held.
    fn pump(inner: &Arc<PreloaderInner>) {
        if inner.cancel.is_cancelled() {
            return;
        }
        let reading = inner.monitor.current_reading();
        let metrics = inner.monitor.quality_metrics();
        let online = inner.monitor.is_online();
        let timeout_multiplier = inner.monitor.adaptation_strategy().timeout_multiplier;
        let now = Instant::now();

        let (expired, dispatches) = {
            let mut state = inner.state.lock();
            state
                .budget
                .recompute(reading.downlink_mbps, inner.config.budget_share);

            let expired = state.queue.drain_expired(now);
            state.expired += expired.len() as u64;

            let mut dispatches = Vec::new();
            let gates_open = state.strategy.enabled
                && online
                && !reading.save_data
                && reading.downlink_mbps >= state.strategy.bandwidth_threshold_mbps
                && metrics.score >= state.strategy.quality_threshold;
            if gates_open {
                while state.in_flight.len() < state.strategy.max_concurrent_preloads {
                    let head_fits = state
                        .queue
                        .peek_best(
                            &inner.config.priority_weights,
                            &inner.config.reason_weights,
                            now,
                        )
                        .is_some_and(|head| {
                            head.estimated_size_bytes <= state.budget.available()
                        });
                    if !head_fits {
                        // Stop on the first oversized head rather than
                        // letting smaller, lower-scored requests skip ahead.
                        break;
                    }
                    let Some(request) = state.queue.pop_best(
                        &inner.config.priority_weights,
                        &inner.config.reason_weights,
                        now,
                    ) else {
                        break;
                    };
                    if !state.budget.debit(request.estimated_size_bytes) {
                        break;
                    }
                    state.in_flight.insert(request.resource_id.clone());
                    state.dispatched += 1;
                    dispatches.push(request);
                }
            }
            (expired, dispatches)
        };

        for request in &expired {
            tracing::debug!(resource = %request.resource_id, "preload expired before dispatch");
            inner.listeners.notify(&SettledEvent {
                request: request.clone(),
                success: false,
            });
        }
        for request in dispatches {
            tracing::debug!(
                resource = %request.resource_id,
                size = request.estimated_size_bytes,
                "dispatching preload"
            );
            Self::spawn_credit_timer(inner, request.estimated_size_bytes);
            Self::spawn_fetch(inner, request, timeout_multiplier);
        }
    }

    fn spawn_credit_timer(inner: &Arc<PreloaderInner>, size: u64) {
        let weak = Arc::downgrade(inner);
        let window = inner.config.budget_window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let Some(inner) = weak.upgrade() else { return };
            inner.state.lock().budget.credit(size);
            Self::pump(&inner);
        });
    }

    fn spawn_fetch(inner: &Arc<PreloaderInner>, request: PreloadRequest, timeout_multiplier: f64) {
        let weak = Arc::downgrade(inner);
        let fetcher = Arc::clone(&inner.fetcher);
        let timeout = inner
            .config
            .preload_timeout
            .mul_f64(timeout_multiplier.max(0.1));
        let cancel = inner.cancel.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return,
                result = tokio::time::timeout(timeout, fetcher.fetch(&request.resource_id)) => result,
            };
            let Some(inner) = weak.upgrade() else { return };
            let result = match outcome {
                Ok(Ok(bytes)) => Ok(bytes),
                Ok(Err(err)) => Err(SettleFailure::Fetch(err)),
                Err(_) => Err(SettleFailure::TimedOut(timeout)),
            };
            Self::settle(&inner, request, result);
        });
    }

    fn settle(
        inner: &Arc<PreloaderInner>,
        request: PreloadRequest,
        result: Result<Bytes, SettleFailure>,
    ) {
        let (was_cancelled, payload) = {
            let mut state = inner.state.lock();
            state.in_flight.remove(&request.resource_id);
            if state.cancelled_in_flight.remove(&request.resource_id) {
                state.cancelled += 1;
                (true, None)
            } else {
                let payload = result.as_ref().ok().cloned();
                let bytes = payload.as_ref().map_or(0, |b| b.len() as u64);
                if payload.is_some() {
                    state.succeeded += 1;
                    state.bytes_preloaded += bytes;
                } else {
                    state.failed += 1;
                }
                if state.history.len() == inner.config.dispatch_history {
                    state.history.pop_front();
                }
                state.history.push_back(DispatchRecord {
                    success: payload.is_some(),
                    bytes,
                    timestamp: Instant::now(),
                });
                (false, payload)
            }
        };

        if was_cancelled {
            tracing::debug!(resource = %request.resource_id, "cancelled preload result discarded");
        } else {
            match &result {
                Ok(bytes) => {
                    tracing::debug!(
                        resource = %request.resource_id,
                        bytes = bytes.len(),
                        "preload completed"
                    );
                }
                Err(SettleFailure::Fetch(err)) => {
                    tracing::debug!(resource = %request.resource_id, error = %err, "preload failed");
                }
                Err(SettleFailure::TimedOut(timeout)) => {
                    tracing::debug!(
                        resource = %request.resource_id,
                        timeout_ms = timeout.as_millis() as u64,
                        "preload timed out"
                    );
                }
            }
            if let Some(bytes) = &payload {
                let sink = inner.sink.lock().clone();
                if let Some(sink) = sink {
                    sink.preloaded(&request, bytes);
                }
            }
            inner.listeners.notify(&SettledEvent {
                request,
                success: payload.is_some(),
            });
        }

        Self::pump(inner);
    }
}

enum SettleFailure {
    Fetch(FetchError),
    TimedOut(Duration),
}
