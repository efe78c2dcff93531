//! The intermittent-connectivity handler component.
//!
//! Wraps the fetcher with an offline cache and a reconnection machine so
//! loads keep resolving across flaky connections:
//!
//! - offline loads are served from cache, and misses fail fast;
//! - online loads go to the network first (cache first when configured or
//!   when conditions are unstable) and fall back to cache on failure;
//! - offline cache misses are queued and refreshed in the background once
//!   the connection returns.
//!
//! # Shutdown
//!
//! Reconnection and sync tasks hold weak references and per-cycle
//! cancellation tokens; [`destroy`](ConnectivityHandler::destroy) stops
//! them all.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::{ConnectivityConfig, SYNC_DRAIN_INTERVAL, UNSTABLE_CACHE_FIRST_WINDOW};
use crate::connectivity::backoff::RetryStrategy;
use crate::connectivity::cache::{CacheStats, CachedResource, ResourceCache};
use crate::connectivity::state::{ConnectivityState, ReconnectionPhase};
use crate::error::LoadError;
use crate::events::ListenerId;
use crate::fetch::ResourceFetcher;
use crate::monitor::{ConnectionEvent, ConnectionEventKind, QualityMonitor, UNSTABLE_STABILITY};
use crate::preload::{PreloadRequest, PreloadSink};
use crate::types::Priority;

/// Partial update to the handler's policy; `None` fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ConnectivityStrategyUpdate {
    /// Consult the cache before the network even when online.
    pub cache_first: Option<bool>,
    /// New maximum cached-entry age (future admissions).
    pub max_cache_age: Option<Duration>,
    /// New cache size bound, enforced immediately.
    pub max_cache_size: Option<u64>,
    /// Toggle priority-aware eviction.
    pub priority_eviction: Option<bool>,
    /// Toggle post-reconnection background refresh.
    pub background_sync: Option<bool>,
    /// New reconnection backoff schedule.
    pub retry_strategy: Option<RetryStrategy>,
}

struct HandlerState {
    phase: ReconnectionPhase,
    offline_since: Option<Instant>,
    reconnect_attempts: u32,
    cache_first: bool,
    cache_first_until: Option<Instant>,
    background_sync: bool,
    retry_strategy: RetryStrategy,
    cache: ResourceCache,
    sync_queue: VecDeque<String>,
    reconnect_cancel: Option<CancellationToken>,
    sync_cancel: Option<CancellationToken>,
}

struct HandlerInner {
    fetcher: Arc<dyn ResourceFetcher>,
    monitor: QualityMonitor,
    state: Mutex<HandlerState>,
    monitor_listener: Mutex<Option<ListenerId>>,
    cancel: CancellationToken,
}

/// Intermittent-connectivity handler.
///
/// Cheap to clone; clones share state. Construct inside a Tokio runtime.
#[derive(Clone)]
pub struct ConnectivityHandler {
    inner: Arc<HandlerInner>,
}

impl std::fmt::Debug for ConnectivityHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ConnectivityHandler")
            .field("phase", &state.phase)
            .field("cached_entries", &state.cache.len())
            .field("pending_sync", &state.sync_queue.len())
            .finish_non_exhaustive()
    }
}

impl ConnectivityHandler {
    /// Create a handler bound to a fetcher and a quality monitor.
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        monitor: QualityMonitor,
        config: ConnectivityConfig,
    ) -> Self {
        let state = HandlerState {
            phase: ReconnectionPhase::StableOnline,
            offline_since: None,
            reconnect_attempts: 0,
            cache_first: config.cache_first,
            cache_first_until: None,
            background_sync: config.background_sync,
            retry_strategy: config.retry_strategy,
            cache: ResourceCache::new(
                config.max_cache_age,
                config.max_cache_size,
                config.priority_eviction,
            ),
            sync_queue: VecDeque::new(),
            reconnect_cancel: None,
            sync_cancel: None,
        };
        let inner = Arc::new(HandlerInner {
            fetcher,
            monitor,
            state: Mutex::new(state),
            monitor_listener: Mutex::new(None),
            cancel: CancellationToken::new(),
        });

        let weak = Arc::downgrade(&inner);
        let listener_id = inner.monitor.add_listener(move |event| {
            let Some(inner) = weak.upgrade() else { return };
            Self::on_connection_event(&inner, event);
        });
        *inner.monitor_listener.lock() = Some(listener_id);

        Self { inner }
    }

    /// Load a resource, resolving through cache and network as conditions
    /// dictate.
    ///
    /// Offline: cache hit or [`LoadError::OfflineNoCache`] (the miss is
    /// queued for background refresh when sync is enabled). Online: network
    /// first unless cache-first is active, with a cache fallback when the
    /// fetch fails or times out. Successful fetches are admitted to the
    /// cache.
    pub async fn load_resource(
        &self,
        resource_id: &str,
        priority: Priority,
        timeout: Duration,
    ) -> Result<Bytes, LoadError> {
        if self.inner.cancel.is_cancelled() {
            return Err(LoadError::ShuttingDown);
        }
        let now = Instant::now();

        if !self.inner.monitor.is_online() {
            let mut state = self.inner.state.lock();
            return match state.cache.get(resource_id, now) {
                Some(bytes) => {
                    tracing::debug!(resource = %resource_id, "offline load served from cache");
                    Ok(bytes)
                }
                None => {
                    if state.background_sync
                        && !state.sync_queue.iter().any(|id| id == resource_id)
                    {
                        state.sync_queue.push_back(resource_id.to_string());
                    }
                    Err(LoadError::OfflineNoCache {
                        resource_id: resource_id.to_string(),
                    })
                }
            };
        }

        if self.cache_first_active(now) {
            if let Some(bytes) = self.inner.state.lock().cache.get(resource_id, now) {
                tracing::debug!(resource = %resource_id, "cache-first load served from cache");
                return Ok(bytes);
            }
        }

        match tokio::time::timeout(timeout, self.inner.fetcher.fetch(resource_id)).await {
            Ok(Ok(bytes)) => {
                self.inner.state.lock().cache.insert(
                    resource_id,
                    bytes.clone(),
                    priority,
                    Instant::now(),
                );
                Ok(bytes)
            }
            Ok(Err(err)) => {
                let fallback = self.inner.state.lock().cache.get(resource_id, Instant::now());
                match fallback {
                    Some(bytes) => {
                        tracing::debug!(
                            resource = %resource_id,
                            error = %err,
                            "fetch failed, serving cached copy"
                        );
                        Ok(bytes)
                    }
                    None => Err(LoadError::Fetch {
                        resource_id: resource_id.to_string(),
                        source: err,
                    }),
                }
            }
            Err(_) => {
                let fallback = self.inner.state.lock().cache.get(resource_id, Instant::now());
                match fallback {
                    Some(bytes) => {
                        tracing::debug!(resource = %resource_id, "fetch timed out, serving cached copy");
                        Ok(bytes)
                    }
                    None => Err(LoadError::Timeout {
                        resource_id: resource_id.to_string(),
                        timeout_ms: timeout.as_millis() as u64,
                    }),
                }
            }
        }
    }

    /// Admit a payload into the offline cache directly.
    pub fn cache_resource(&self, resource_id: &str, payload: Bytes, priority: Priority) {
        self.inner
            .state
            .lock()
            .cache
            .insert(resource_id, payload, priority, Instant::now());
    }

    /// Inspect a cached entry without touching its recency.
    pub fn cached_resource(&self, resource_id: &str) -> Option<CachedResource> {
        self.inner
            .state
            .lock()
            .cache
            .peek(resource_id, Instant::now())
            .cloned()
    }

    /// Current connectivity snapshot.
    pub fn connectivity_state(&self) -> ConnectivityState {
        let online = self.inner.monitor.is_online();
        let unstable = self.inner.monitor.connection_stability() < UNSTABLE_STABILITY;
        let state = self.inner.state.lock();
        let now = Instant::now();
        ConnectivityState {
            phase: state.phase,
            online,
            offline_duration: state
                .offline_since
                .map(|since| now.duration_since(since))
                .unwrap_or_default(),
            reconnect_attempts: state.reconnect_attempts,
            cache_first_active: state.cache_first
                || unstable
                || state.cache_first_until.is_some_and(|until| until > now),
            pending_sync: state.sync_queue.len(),
        }
    }

    /// Current cache counters and occupancy.
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.state.lock().cache.stats()
    }

    /// Apply a partial policy update.
    pub fn update_strategy(&self, update: ConnectivityStrategyUpdate) {
        let mut state = self.inner.state.lock();
        if let Some(cache_first) = update.cache_first {
            state.cache_first = cache_first;
        }
        if let Some(max_age) = update.max_cache_age {
            state.cache.set_max_age(max_age);
        }
        if let Some(max_size) = update.max_cache_size {
            state.cache.set_max_size(max_size, Instant::now());
        }
        if let Some(enabled) = update.priority_eviction {
            state.cache.set_priority_eviction(enabled);
        }
        if let Some(enabled) = update.background_sync {
            state.background_sync = enabled;
        }
        if let Some(strategy) = update.retry_strategy {
            state.retry_strategy = strategy;
        }
    }

    /// Drop every cached entry.
    pub fn clear_cache(&self) {
        self.inner.state.lock().cache.clear();
    }

    /// Stop background work. The cache remains readable.
    pub fn destroy(&self) {
        self.inner.cancel.cancel();
        if let Some(id) = self.inner.monitor_listener.lock().take() {
            self.inner.monitor.remove_listener(id);
        }
        let mut state = self.inner.state.lock();
        if let Some(token) = state.reconnect_cancel.take() {
            token.cancel();
        }
        if let Some(token) = state.sync_cancel.take() {
            token.cancel();
        }
        state.sync_queue.clear();
    }

    /// Cache-first applies when configured, while the post-unstable-event
    /// window is open, or while measured stability is below the unstable
    /// threshold. The monitor is consulted before taking the state lock.
    fn cache_first_active(&self, now: Instant) -> bool {
        let unstable = self.inner.monitor.connection_stability() < UNSTABLE_STABILITY;
        let state = self.inner.state.lock();
        state.cache_first
            || unstable
            || state.cache_first_until.is_some_and(|until| until > now)
    }

    fn on_connection_event(inner: &Arc<HandlerInner>, event: &ConnectionEvent) {
        match event.kind {
            ConnectionEventKind::Offline => Self::begin_outage(inner),
            ConnectionEventKind::Online => Self::complete_reconnect(inner),
            ConnectionEventKind::Unstable => {
                tracing::info!("unstable connection, forcing cache-first loads");
                inner.state.lock().cache_first_until =
                    Some(Instant::now() + UNSTABLE_CACHE_FIRST_WINDOW);
            }
            ConnectionEventKind::Fast | ConnectionEventKind::Slow => {}
        }
    }

    fn begin_outage(inner: &Arc<HandlerInner>) {
        let token = {
            let mut state = inner.state.lock();
            if state.phase != ReconnectionPhase::StableOnline {
                return;
            }
            state.phase = ReconnectionPhase::Offline;
            state.offline_since = Some(Instant::now());
            state.reconnect_attempts = 0;
            if let Some(old) = state.sync_cancel.take() {
                old.cancel();
            }
            let token = inner.cancel.child_token();
            state.reconnect_cancel = Some(token.clone());
            token
        };
        tracing::info!("connection lost, starting reconnection attempts");
        Self::spawn_reconnect_loop(inner, token);
    }

    fn spawn_reconnect_loop(inner: &Arc<HandlerInner>, token: CancellationToken) {
        let weak: Weak<HandlerInner> = Arc::downgrade(inner);
        tokio::spawn(async move {
            loop {
                let delay = {
                    let Some(inner) = weak.upgrade() else { return };
                    let state = inner.state.lock();
                    state.retry_strategy.delay(state.reconnect_attempts)
                };
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
                let Some(inner) = weak.upgrade() else { return };
                inner.state.lock().phase = ReconnectionPhase::Reconnecting;
                if inner.monitor.is_online() {
                    Self::complete_reconnect(&inner);
                    return;
                }
                let mut state = inner.state.lock();
                state.reconnect_attempts += 1;
                state.phase = ReconnectionPhase::Offline;
                tracing::debug!(
                    attempts = state.reconnect_attempts,
                    "reconnection attempt failed"
                );
            }
        });
    }

    fn complete_reconnect(inner: &Arc<HandlerInner>) {
        let start_sync = {
            let mut state = inner.state.lock();
            if let Some(token) = state.reconnect_cancel.take() {
                token.cancel();
            }
            state.phase = ReconnectionPhase::StableOnline;
            state.offline_since = None;
            state.reconnect_attempts = 0;
            state.background_sync && !state.sync_queue.is_empty()
        };
        tracing::info!(sync = start_sync, "connection restored");
        if start_sync {
            Self::spawn_sync_drain(inner);
        }
    }

    /// Refresh offline-missed resources one per drain interval.
    fn spawn_sync_drain(inner: &Arc<HandlerInner>) {
        let token = {
            let mut state = inner.state.lock();
            if let Some(old) = state.sync_cancel.take() {
                old.cancel();
            }
            let token = inner.cancel.child_token();
            state.sync_cancel = Some(token.clone());
            token
        };
        let weak: Weak<HandlerInner> = Arc::downgrade(inner);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(SYNC_DRAIN_INTERVAL) => {}
                }
                let Some(inner) = weak.upgrade() else { return };
                if !inner.monitor.is_online() {
                    return;
                }
                let Some(id) = inner.state.lock().sync_queue.pop_front() else {
                    inner.state.lock().sync_cancel = None;
                    return;
                };
                match inner.fetcher.fetch(&id).await {
                    Ok(bytes) => {
                        inner.state.lock().cache.insert(
                            id.clone(),
                            bytes,
                            Priority::Normal,
                            Instant::now(),
                        );
                        tracing::debug!(resource = %id, "background sync refreshed resource");
                    }
                    Err(err) => {
                        tracing::debug!(resource = %id, error = %err, "background sync fetch failed");
                    }
                }
            }
        });
    }
}

impl PreloadSink for ConnectivityHandler {
    fn preloaded(&self, request: &PreloadRequest, payload: &Bytes) {
        self.cache_resource(&request.resource_id, payload.clone(), request.priority);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use crate::telemetry::{EffectiveClass, NetworkReading, StaticTelemetry};

    fn setup(fetcher: Arc<StaticFetcher>) -> (ConnectivityHandler, QualityMonitor) {
        let telemetry = Arc::new(StaticTelemetry::with_reading(NetworkReading::new(
            EffectiveClass::FourG,
            10.0,
            50.0,
        )));
        let monitor = QualityMonitor::with_defaults(telemetry as _);
        let handler = ConnectivityHandler::new(
            fetcher as _,
            monitor.clone(),
            ConnectivityConfig::default(),
        );
        (handler, monitor)
    }

    async fn settle_tasks() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_online_load_fetches_and_caches() {
        let fetcher = Arc::new(StaticFetcher::new());
        fetcher.insert("a", &b"payload"[..]);
        let (handler, _monitor) = setup(fetcher);

        let bytes = handler
            .load_resource("a", Priority::Normal, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(bytes, Bytes::from_static(b"payload"));
        assert!(handler.cached_resource("a").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_load_served_from_cache() {
        let fetcher = Arc::new(StaticFetcher::new());
        let (handler, monitor) = setup(fetcher);
        handler.cache_resource("a", Bytes::from_static(b"cached"), Priority::Normal);

        monitor.set_online(false);
        let bytes = handler
            .load_resource("a", Priority::Normal, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(bytes, Bytes::from_static(b"cached"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_miss_fails_fast_and_queues_sync() {
        let fetcher = Arc::new(StaticFetcher::new());
        let (handler, monitor) = setup(fetcher);
        monitor.set_online(false);

        let err = handler
            .load_resource("missing", Priority::Normal, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::OfflineNoCache { .. }));
        assert_eq!(handler.connectivity_state().pending_sync, 1);

        // A second miss for the same id is not queued twice.
        let _ = handler
            .load_resource("missing", Priority::Normal, Duration::from_secs(5))
            .await;
        assert_eq!(handler.connectivity_state().pending_sync, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_falls_back_to_cache() {
        let fetcher = Arc::new(StaticFetcher::new()); // empty, fetches fail
        let (handler, _monitor) = setup(fetcher);
        handler.cache_resource("a", Bytes::from_static(b"stale"), Priority::Normal);

        let bytes = handler
            .load_resource("a", Priority::Normal, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(bytes, Bytes::from_static(b"stale"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_without_cache_errors() {
        let fetcher = Arc::new(StaticFetcher::new());
        let (handler, _monitor) = setup(fetcher);

        let err = handler
            .load_resource("a", Priority::Normal, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Fetch { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_without_cache_errors() {
        let fetcher = Arc::new(StaticFetcher::with_latency(Duration::from_secs(60)));
        fetcher.insert("slow", &b"x"[..]);
        let (handler, _monitor) = setup(fetcher);

        let err = handler
            .load_resource("slow", Priority::Normal, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Timeout { timeout_ms: 1000, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_first_skips_network() {
        let fetcher = Arc::new(StaticFetcher::new());
        fetcher.insert("a", &b"network"[..]);
        let (handler, _monitor) = setup(fetcher);
        handler.cache_resource("a", Bytes::from_static(b"cached"), Priority::Normal);
        handler.update_strategy(ConnectivityStrategyUpdate {
            cache_first: Some(true),
            ..Default::default()
        });

        let bytes = handler
            .load_resource("a", Priority::Normal, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(bytes, Bytes::from_static(b"cached"));
    }

    fn collapse_stability(monitor: &QualityMonitor) {
        for i in 0..10 {
            let reading = if i % 2 == 0 {
                NetworkReading::new(EffectiveClass::Slow2g, 0.1, 3000.0)
            } else {
                NetworkReading::new(EffectiveClass::FourG, 10.0, 50.0)
            };
            monitor.update_reading(reading);
        }
    }

    fn restore_stability(monitor: &QualityMonitor) {
        for _ in 0..10 {
            monitor.update_reading(NetworkReading::new(EffectiveClass::FourG, 10.0, 50.0));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unstable_event_forces_cache_first_window() {
        let fetcher = Arc::new(StaticFetcher::new());
        let (handler, monitor) = setup(fetcher);
        assert!(!handler.connectivity_state().cache_first_active);

        // Collapsing stability emits an unstable event, which arms the window.
        collapse_stability(&monitor);
        assert!(handler.connectivity_state().cache_first_active);

        // Once the link steadies and the window lapses, loads go network-first.
        tokio::time::advance(UNSTABLE_CACHE_FIRST_WINDOW + Duration::from_secs(1)).await;
        restore_stability(&monitor);
        assert!(!handler.connectivity_state().cache_first_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_instability_keeps_cache_first() {
        let fetcher = Arc::new(StaticFetcher::new());
        fetcher.insert("a", &b"network"[..]);
        let (handler, monitor) = setup(Arc::clone(&fetcher));
        handler.cache_resource("a", Bytes::from_static(b"cached"), Priority::Normal);

        collapse_stability(&monitor);
        tokio::time::advance(UNSTABLE_CACHE_FIRST_WINDOW + Duration::from_secs(1)).await;
        settle_tasks().await;

        // The event window has lapsed but measured stability is still low,
        // so loads keep consulting the cache first.
        assert!(monitor.connection_stability() < UNSTABLE_STABILITY);
        assert!(handler.connectivity_state().cache_first_active);
        let bytes = handler
            .load_resource("a", Priority::Normal, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(bytes, Bytes::from_static(b"cached"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnection_machine_counts_attempts() {
        let fetcher = Arc::new(StaticFetcher::new());
        let (handler, monitor) = setup(fetcher);

        monitor.set_online(false);
        settle_tasks().await;
        let state = handler.connectivity_state();
        assert_eq!(state.phase, ReconnectionPhase::Offline);
        assert_eq!(state.reconnect_attempts, 0);

        // Exponential schedule: attempts at 1 s, 2 s, 4 s...
        tokio::time::advance(Duration::from_secs(1)).await;
        settle_tasks().await;
        assert_eq!(handler.connectivity_state().reconnect_attempts, 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        settle_tasks().await;
        assert_eq!(handler.connectivity_state().reconnect_attempts, 2);
        assert!(handler.connectivity_state().offline_duration >= Duration::from_secs(3));

        monitor.set_online(true);
        settle_tasks().await;
        let state = handler.connectivity_state();
        assert_eq!(state.phase, ReconnectionPhase::StableOnline);
        assert_eq!(state.reconnect_attempts, 0);
        assert_eq!(state.offline_duration, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sync_refreshes_offline_misses() {
        let fetcher = Arc::new(StaticFetcher::new());
        let (handler, monitor) = setup(Arc::clone(&fetcher));

        monitor.set_online(false);
        let _ = handler
            .load_resource("x", Priority::Normal, Duration::from_secs(5))
            .await;
        assert_eq!(handler.connectivity_state().pending_sync, 1);

        // The payload appears upstream while we are offline.
        fetcher.insert("x", &b"synced"[..]);
        monitor.set_online(true);
        settle_tasks().await;

        // Let the drain task register its timer before each advance.
        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(1)).await;
            settle_tasks().await;
        }

        assert_eq!(handler.connectivity_state().pending_sync, 0);
        let entry = handler.cached_resource("x").expect("synced into cache");
        assert_eq!(entry.payload, Bytes::from_static(b"synced"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_preload_sink_admits_to_cache() {
        let fetcher = Arc::new(StaticFetcher::new());
        let (handler, _monitor) = setup(fetcher);

        let request = PreloadRequest::new(
            "p",
            Priority::High,
            crate::types::ReasonTag::Navigation,
            0.9,
            100,
        );
        handler.preloaded(&request, &Bytes::from_static(b"speculative"));

        let entry = handler.cached_resource("p").expect("admitted");
        assert_eq!(entry.priority, Priority::High);
        assert_eq!(entry.payload, Bytes::from_static(b"speculative"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_rejects_loads() {
        let fetcher = Arc::new(StaticFetcher::new());
        fetcher.insert("a", &b"x"[..]);
        let (handler, _monitor) = setup(fetcher);

        handler.destroy();
        let err = handler
            .load_resource("a", Priority::Normal, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::ShuttingDown));
    }
}
