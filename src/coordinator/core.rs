//! The adaptation coordinator component.
//!
//! Owns the monitor, preloader and connectivity handler, wires them
//! together (successful preloads land in the handler's cache), and exposes
//! the combined surface hosts interact with: recommendations, gated
//! preloads, resolved loads and a metrics snapshot.
//!
//! On every connection event the coordinator retunes the preloader's
//! thresholds for the configured aggressiveness profile, flips the
//! handler's cache-first policy to match the current recommendation, and
//! pushes a fresh metrics snapshot to its listeners.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::{AdaptationConfig, AdaptationConfigUpdate, LoaderConfig};
use crate::connectivity::{
    CacheStats, ConnectivityHandler, ConnectivityState, ConnectivityStrategyUpdate,
};
use crate::coordinator::recommendation::{
    derive_recommendation, LoadingRecommendation, RecommendationReason,
};
use crate::error::LoadError;
use crate::events::{ListenerId, ListenerSet};
use crate::fetch::ResourceFetcher;
use crate::monitor::{AdaptationStrategy, QualityMetrics, QualityMonitor};
use crate::preload::{BandwidthPreloader, BandwidthStats, PreloadRequest, PreloadStrategyUpdate};
use crate::telemetry::{NetworkReading, TelemetrySource};
use crate::types::{LoadContext, Priority, ReasonTag};

/// Combined metrics snapshot across all components.
#[derive(Debug, Clone)]
pub struct LoaderMetrics {
    /// Whether the host is currently online.
    pub online: bool,
    /// Whether the connection is classified as intermittent.
    pub intermittent: bool,
    /// The reading the estimate is based on.
    pub reading: NetworkReading,
    /// Current quality estimate.
    pub quality: QualityMetrics,
    /// Current coarse behavior recommendation.
    pub strategy: AdaptationStrategy,
    /// Preloader statistics.
    pub preload: BandwidthStats,
    /// Offline cache statistics.
    pub cache: CacheStats,
    /// Connectivity handler snapshot.
    pub connectivity: ConnectivityState,
    /// Loads issued through the coordinator.
    pub loads_issued: u64,
    /// Preloads forwarded to the preloader.
    pub preloads_requested: u64,
    /// Preloads suppressed by the current recommendation.
    pub preloads_suppressed: u64,
    /// Connection events the coordinator has reacted to.
    pub adaptation_events: u64,
}

#[derive(Default)]
struct Counters {
    loads_issued: u64,
    preloads_requested: u64,
    preloads_suppressed: u64,
    adaptation_events: u64,
}

struct CoordinatorInner {
    monitor: QualityMonitor,
    preloader: BandwidthPreloader,
    handler: ConnectivityHandler,
    adaptation: Mutex<AdaptationConfig>,
    counters: Mutex<Counters>,
    metrics_listeners: ListenerSet<LoaderMetrics>,
    monitor_listener: Mutex<Option<ListenerId>>,
    cancel: CancellationToken,
}

/// Adaptation coordinator, the top-level component of the loading core.
///
/// Cheap to clone; clones share state. Construct inside a Tokio runtime.
#[derive(Clone)]
pub struct AdaptationCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl std::fmt::Debug for AdaptationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counters = self.inner.counters.lock();
        f.debug_struct("AdaptationCoordinator")
            .field("loads_issued", &counters.loads_issued)
            .field("preloads_requested", &counters.preloads_requested)
            .field("adaptation_events", &counters.adaptation_events)
            .finish_non_exhaustive()
    }
}

impl AdaptationCoordinator {
    /// Build the full component stack from a telemetry source and a fetcher.
    pub fn new(
        telemetry: Arc<dyn TelemetrySource>,
        fetcher: Arc<dyn ResourceFetcher>,
        config: LoaderConfig,
    ) -> Self {
        let monitor = QualityMonitor::new(telemetry, config.monitoring);
        let preloader = BandwidthPreloader::new(
            Arc::clone(&fetcher),
            monitor.clone(),
            config.preloading,
        );
        let handler = ConnectivityHandler::new(fetcher, monitor.clone(), config.connectivity);
        preloader.set_sink(Arc::new(handler.clone()));

        let inner = Arc::new(CoordinatorInner {
            monitor,
            preloader,
            handler,
            adaptation: Mutex::new(config.adaptation),
            counters: Mutex::new(Counters::default()),
            metrics_listeners: ListenerSet::new(),
            monitor_listener: Mutex::new(None),
            cancel: CancellationToken::new(),
        });

        let coordinator = Self { inner };
        coordinator.apply_aggressiveness();

        let weak = Arc::downgrade(&coordinator.inner);
        let listener_id = coordinator.inner.monitor.add_listener(move |_event| {
            let Some(inner) = weak.upgrade() else { return };
            Self::on_adaptation_event(&inner);
        });
        *coordinator.inner.monitor_listener.lock() = Some(listener_id);

        coordinator
    }

    /// Build the stack with default configuration.
    pub fn with_defaults(
        telemetry: Arc<dyn TelemetrySource>,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> Self {
        Self::new(telemetry, fetcher, LoaderConfig::default())
    }

    /// The quality monitor.
    pub fn monitor(&self) -> &QualityMonitor {
        &self.inner.monitor
    }

    /// The preloader.
    pub fn preloader(&self) -> &BandwidthPreloader {
        &self.inner.preloader
    }

    /// The connectivity handler.
    pub fn handler(&self) -> &ConnectivityHandler {
        &self.inner.handler
    }

    /// Advice for loading a resource under current conditions.
    pub fn loading_recommendation(
        &self,
        resource_id: &str,
        priority: Priority,
        context: &LoadContext,
    ) -> LoadingRecommendation {
        let recommendation = Self::derive(&self.inner, priority, context);
        tracing::debug!(
            resource = %resource_id,
            reason = ?recommendation.reason,
            timeout_ms = recommendation.timeout_ms,
            "loading recommendation"
        );
        recommendation
    }

    /// Request a speculative preload, gated on the current recommendation.
    ///
    /// Offline, poor-quality or intermittent conditions suppress the
    /// request; otherwise it is forwarded to the preloader. When priority
    /// boosting is enabled the queued confidence is scaled by the strategy
    /// table's per-priority boost factor. Returns `true` only when the
    /// preloader accepted it.
    pub fn request_preload(
        &self,
        resource_id: &str,
        priority: Priority,
        reason: ReasonTag,
        confidence: f64,
        estimated_size_bytes: u64,
    ) -> bool {
        let context = LoadContext::from_reason(reason);
        let recommendation = Self::derive(&self.inner, priority, &context);
        let suppressed = matches!(
            recommendation.reason,
            RecommendationReason::Offline
                | RecommendationReason::PoorQuality
                | RecommendationReason::Intermittent
        );
        if suppressed {
            self.inner.counters.lock().preloads_suppressed += 1;
            tracing::debug!(
                resource = %resource_id,
                reason = ?recommendation.reason,
                "preload suppressed"
            );
            return false;
        }

        let confidence = if self.inner.adaptation.lock().priority_boosting {
            (confidence * AdaptationStrategy::priority_boost(priority)).min(1.0)
        } else {
            confidence
        };
        let request = PreloadRequest::new(
            resource_id,
            priority,
            reason,
            confidence,
            estimated_size_bytes,
        );
        let accepted = self.inner.preloader.request_preload(request);
        if accepted {
            self.inner.counters.lock().preloads_requested += 1;
        }
        accepted
    }

    /// Load a resource through the handler with the recommended timeout.
    pub async fn load_resource(
        &self,
        resource_id: &str,
        priority: Priority,
        context: &LoadContext,
    ) -> Result<Bytes, LoadError> {
        if self.inner.cancel.is_cancelled() {
            return Err(LoadError::ShuttingDown);
        }
        let recommendation = Self::derive(&self.inner, priority, context);
        self.inner.counters.lock().loads_issued += 1;
        self.inner
            .handler
            .load_resource(
                resource_id,
                priority,
                Duration::from_millis(recommendation.timeout_ms),
            )
            .await
    }

    /// Combined metrics snapshot.
    pub fn metrics(&self) -> LoaderMetrics {
        Self::snapshot(&self.inner)
    }

    /// Apply a partial update to the adaptation options and re-apply the
    /// aggressiveness profile to the preloader.
    pub fn update_config(&self, update: AdaptationConfigUpdate) {
        update.apply_to(&mut self.inner.adaptation.lock());
        self.apply_aggressiveness();
    }

    /// Register a listener receiving a metrics snapshot after every
    /// adaptation event.
    pub fn add_metrics_listener(
        &self,
        listener: impl Fn(&LoaderMetrics) + Send + Sync + 'static,
    ) -> ListenerId {
        self.inner.metrics_listeners.add(listener)
    }

    /// Remove a previously registered metrics listener.
    pub fn remove_metrics_listener(&self, id: ListenerId) -> bool {
        self.inner.metrics_listeners.remove(id)
    }

    /// Tear down the whole stack. Metrics getters remain usable.
    pub fn destroy(&self) {
        self.inner.cancel.cancel();
        if let Some(id) = self.inner.monitor_listener.lock().take() {
            self.inner.monitor.remove_listener(id);
        }
        self.inner.metrics_listeners.clear();
        self.inner.preloader.destroy();
        self.inner.handler.destroy();
        self.inner.monitor.destroy();
    }

    /// Push the aggressiveness profile's thresholds and concurrency into
    /// the preloader.
    fn apply_aggressiveness(&self) {
        let profile = self.inner.adaptation.lock().aggressiveness;
        self.inner.preloader.update_strategy(PreloadStrategyUpdate {
            quality_threshold: Some(profile.quality_threshold()),
            bandwidth_threshold_mbps: Some(profile.bandwidth_threshold_mbps()),
            max_concurrent_preloads: Some(profile.max_concurrent_preloads()),
            ..Default::default()
        });
    }

    fn derive(
        inner: &Arc<CoordinatorInner>,
        priority: Priority,
        context: &LoadContext,
    ) -> LoadingRecommendation {
        let online = inner.monitor.is_online();
        let intermittent = inner.monitor.is_intermittent_connection();
        let metrics = inner.monitor.quality_metrics();
        let options = inner.adaptation.lock().clone();
        derive_recommendation(online, intermittent, &metrics, priority, context, &options)
    }

    fn on_adaptation_event(inner: &Arc<CoordinatorInner>) {
        inner.counters.lock().adaptation_events += 1;

        // Retune the preloader's thresholds for the current profile; the
        // preloader keeps tuning its own concurrency and enable flag.
        let profile = inner.adaptation.lock().aggressiveness;
        inner.preloader.update_strategy(PreloadStrategyUpdate {
            quality_threshold: Some(profile.quality_threshold()),
            bandwidth_threshold_mbps: Some(profile.bandwidth_threshold_mbps()),
            ..Default::default()
        });

        // Flip the handler's cache-first policy to match the recommendation
        // a routine load would get right now.
        let recommendation = Self::derive(inner, Priority::Normal, &LoadContext::none());
        inner.handler.update_strategy(ConnectivityStrategyUpdate {
            cache_first: Some(recommendation.use_cache_first),
            ..Default::default()
        });

        let snapshot = Self::snapshot(inner);
        inner.metrics_listeners.notify(&snapshot);
    }

    fn snapshot(inner: &Arc<CoordinatorInner>) -> LoaderMetrics {
        let counters = {
            let counters = inner.counters.lock();
            (
                counters.loads_issued,
                counters.preloads_requested,
                counters.preloads_suppressed,
                counters.adaptation_events,
            )
        };
        LoaderMetrics {
            online: inner.monitor.is_online(),
            intermittent: inner.monitor.is_intermittent_connection(),
            reading: inner.monitor.current_reading(),
            quality: inner.monitor.quality_metrics(),
            strategy: inner.monitor.adaptation_strategy(),
            preload: inner.preloader.bandwidth_stats(),
            cache: inner.handler.cache_stats(),
            connectivity: inner.handler.connectivity_state(),
            loads_issued: counters.0,
            preloads_requested: counters.1,
            preloads_suppressed: counters.2,
            adaptation_events: counters.3,
        }
    }
}
