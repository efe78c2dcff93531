//! Loader configuration.
//!
//! All knobs are optional in the sense that `Default` produces a working
//! configuration; hosts override individual fields. Defaults live in
//! `DEFAULT_*` constants so tests and documentation reference one source.
//!
//! Runtime-adjustable subsets (preload strategy, connectivity strategy,
//! adaptation options) have companion `*Update` structs of `Option` fields
//! for partial updates.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::connectivity::RetryStrategy;
use crate::types::{Priority, ReasonTag};

// ==================== Monitoring Defaults ====================

/// Default interval between background quality assessments.
pub const DEFAULT_ASSESSMENT_INTERVAL: Duration = Duration::from_secs(30);

/// Number of recent quality scores used for the stability estimate.
pub const DEFAULT_SCORE_WINDOW: usize = 10;

/// Default retention window for the connection event history.
pub const DEFAULT_EVENT_RETENTION: Duration = Duration::from_secs(3600);

/// Window over which offline/unstable events classify a connection as
/// intermittent.
pub const DEFAULT_INTERMITTENT_WINDOW: Duration = Duration::from_secs(300);

/// More than this many offline/unstable events inside the window marks the
/// connection intermittent.
pub const DEFAULT_INTERMITTENT_THRESHOLD: usize = 2;

// ==================== Preloading Defaults ====================

/// Default cap on concurrently outstanding preload fetches.
pub const DEFAULT_MAX_CONCURRENT_PRELOADS: usize = 2;

/// Hard ceiling the self-tuning concurrency never exceeds.
pub const MAX_PRELOAD_CONCURRENCY: usize = 4;

/// Minimum downlink required before preloads dispatch, in Mbps.
pub const DEFAULT_BANDWIDTH_THRESHOLD_MBPS: f64 = 1.0;

/// Minimum quality score required before preloads dispatch.
pub const DEFAULT_QUALITY_THRESHOLD: f64 = 0.4;

/// Default bandwidth budget window.
pub const DEFAULT_BUDGET_WINDOW: Duration = Duration::from_millis(10_000);

/// Fraction of estimated link throughput the preloader may reserve.
pub const DEFAULT_BUDGET_SHARE: f64 = 0.3;

/// Bounded length of the dispatch outcome history.
pub const DEFAULT_DISPATCH_HISTORY: usize = 50;

/// Base timeout for a preload fetch, before strategy multipliers.
pub const DEFAULT_PRELOAD_TIMEOUT: Duration = Duration::from_millis(10_000);

// ==================== Connectivity Defaults ====================

/// Default maximum age of a cached resource.
pub const DEFAULT_MAX_CACHE_AGE: Duration = Duration::from_secs(3600);

/// Default maximum total cache size in bytes (50 MiB).
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 50 * 1024 * 1024;

/// How long an unstable event forces cache-first behavior.
pub const UNSTABLE_CACHE_FIRST_WINDOW: Duration = Duration::from_secs(30);

/// Interval between background sync queue drains after reconnection.
pub const SYNC_DRAIN_INTERVAL: Duration = Duration::from_secs(1);

// ==================== Monitoring ====================

/// Quality monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Interval between background quality assessments.
    pub assessment_interval: Duration,
    /// Number of recent scores in the stability window.
    pub score_window: usize,
    /// Retention window for the connection event history.
    pub event_retention: Duration,
    /// Window for intermittent-connection detection.
    pub intermittent_window: Duration,
    /// Offline/unstable event count above which the connection is
    /// considered intermittent.
    pub intermittent_threshold: usize,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            assessment_interval: DEFAULT_ASSESSMENT_INTERVAL,
            score_window: DEFAULT_SCORE_WINDOW,
            event_retention: DEFAULT_EVENT_RETENTION,
            intermittent_window: DEFAULT_INTERMITTENT_WINDOW,
            intermittent_threshold: DEFAULT_INTERMITTENT_THRESHOLD,
        }
    }
}

// ==================== Preloading ====================

/// Per-priority scoring weights for the preload queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriorityWeights {
    /// Weight for critical requests.
    pub critical: f64,
    /// Weight for high-priority requests.
    pub high: f64,
    /// Weight for normal requests.
    pub normal: f64,
    /// Weight for low-priority requests.
    pub low: f64,
}

impl PriorityWeights {
    /// Weight for the given priority.
    pub fn weight(&self, priority: Priority) -> f64 {
        match priority {
            Priority::Critical => self.critical,
            Priority::High => self.high,
            Priority::Normal => self.normal,
            Priority::Low => self.low,
        }
    }
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            critical: 4.0,
            high: 3.0,
            normal: 2.0,
            low: 1.0,
        }
    }
}

/// Per-reason scoring weights for the preload queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReasonWeights {
    /// Weight for viewport-driven preloads.
    pub viewport: f64,
    /// Weight for navigation-predicted preloads.
    pub navigation: f64,
    /// Weight for interaction-driven preloads.
    pub interaction: f64,
    /// Weight for pattern-derived preloads.
    pub pattern: f64,
}

impl ReasonWeights {
    /// Weight for the given reason tag.
    pub fn weight(&self, reason: ReasonTag) -> f64 {
        match reason {
            ReasonTag::Viewport => self.viewport,
            ReasonTag::Navigation => self.navigation,
            ReasonTag::Interaction => self.interaction,
            ReasonTag::Pattern => self.pattern,
        }
    }
}

impl Default for ReasonWeights {
    fn default() -> Self {
        Self {
            viewport: 3.0,
            navigation: 2.5,
            interaction: 2.0,
            pattern: 1.0,
        }
    }
}

/// Bandwidth-aware preloader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreloadConfig {
    /// Cap on concurrently outstanding preload fetches.
    pub max_concurrent_preloads: usize,
    /// Minimum downlink (Mbps) before preloads dispatch.
    pub bandwidth_threshold_mbps: f64,
    /// Minimum quality score before preloads dispatch.
    pub quality_threshold: f64,
    /// Per-priority queue scoring weights.
    pub priority_weights: PriorityWeights,
    /// Per-reason queue scoring weights.
    pub reason_weights: ReasonWeights,
    /// Bandwidth budget window.
    pub budget_window: Duration,
    /// Fraction of link throughput reservable for preloads.
    pub budget_share: f64,
    /// Bounded dispatch history length.
    pub dispatch_history: usize,
    /// Base preload fetch timeout.
    pub preload_timeout: Duration,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_preloads: DEFAULT_MAX_CONCURRENT_PRELOADS,
            bandwidth_threshold_mbps: DEFAULT_BANDWIDTH_THRESHOLD_MBPS,
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            priority_weights: PriorityWeights::default(),
            reason_weights: ReasonWeights::default(),
            budget_window: DEFAULT_BUDGET_WINDOW,
            budget_share: DEFAULT_BUDGET_SHARE,
            dispatch_history: DEFAULT_DISPATCH_HISTORY,
            preload_timeout: DEFAULT_PRELOAD_TIMEOUT,
        }
    }
}

// ==================== Connectivity ====================

/// Intermittent-connectivity handler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// Serve from cache before attempting the network, even when online.
    pub cache_first: bool,
    /// Maximum age of a cached resource before it expires.
    pub max_cache_age: Duration,
    /// Maximum total cache size in bytes.
    pub max_cache_size: u64,
    /// Evict by (priority, recency) instead of recency alone.
    pub priority_eviction: bool,
    /// Refresh offline-missed resources after reconnection.
    pub background_sync: bool,
    /// Reconnection backoff strategy.
    pub retry_strategy: RetryStrategy,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            cache_first: false,
            max_cache_age: DEFAULT_MAX_CACHE_AGE,
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            priority_eviction: true,
            background_sync: true,
            retry_strategy: RetryStrategy::Exponential,
        }
    }
}

// ==================== Adaptation ====================

/// How eagerly the coordinator tunes the preloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggressiveness {
    /// High thresholds, minimal speculative traffic.
    Conservative,
    /// The defaults.
    Balanced,
    /// Low thresholds, more concurrency.
    Aggressive,
}

impl Aggressiveness {
    /// Quality threshold applied to the preloader for this profile.
    pub fn quality_threshold(self) -> f64 {
        match self {
            Aggressiveness::Conservative => 0.6,
            Aggressiveness::Balanced => DEFAULT_QUALITY_THRESHOLD,
            Aggressiveness::Aggressive => 0.3,
        }
    }

    /// Bandwidth threshold (Mbps) applied to the preloader for this profile.
    pub fn bandwidth_threshold_mbps(self) -> f64 {
        match self {
            Aggressiveness::Conservative => 2.0,
            Aggressiveness::Balanced => DEFAULT_BANDWIDTH_THRESHOLD_MBPS,
            Aggressiveness::Aggressive => 0.5,
        }
    }

    /// Preload concurrency applied for this profile.
    pub fn max_concurrent_preloads(self) -> usize {
        match self {
            Aggressiveness::Conservative => 1,
            Aggressiveness::Balanced => DEFAULT_MAX_CONCURRENT_PRELOADS,
            Aggressiveness::Aggressive => 3,
        }
    }
}

/// Coordinator adaptation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationConfig {
    /// Tuning profile for preloader retunes.
    pub aggressiveness: Aggressiveness,
    /// Scale timeouts and preload confidence per priority (critical fails
    /// fastest, high-priority preloads queue with boosted confidence).
    pub priority_boosting: bool,
    /// Scale recommended timeouts by measured RTT.
    pub dynamic_timeouts: bool,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            aggressiveness: Aggressiveness::Balanced,
            priority_boosting: true,
            dynamic_timeouts: true,
        }
    }
}

/// Partial update to the adaptation options; `None` fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AdaptationConfigUpdate {
    /// New tuning profile.
    pub aggressiveness: Option<Aggressiveness>,
    /// Toggle per-priority boosting.
    pub priority_boosting: Option<bool>,
    /// Toggle RTT-based timeout scaling.
    pub dynamic_timeouts: Option<bool>,
}

impl AdaptationConfigUpdate {
    /// Fold the set fields into an existing config.
    pub fn apply_to(&self, config: &mut AdaptationConfig) {
        if let Some(aggressiveness) = self.aggressiveness {
            config.aggressiveness = aggressiveness;
        }
        if let Some(enabled) = self.priority_boosting {
            config.priority_boosting = enabled;
        }
        if let Some(enabled) = self.dynamic_timeouts {
            config.dynamic_timeouts = enabled;
        }
    }
}

// ==================== Aggregate ====================

/// Top-level configuration for the adaptive loading core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Quality monitor settings.
    pub monitoring: MonitoringConfig,
    /// Preloader settings.
    pub preloading: PreloadConfig,
    /// Connectivity handler settings.
    pub connectivity: ConnectivityConfig,
    /// Coordinator adaptation settings.
    pub adaptation: AdaptationConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_monitoring_config() {
        let config = MonitoringConfig::default();
        assert_eq!(config.assessment_interval, Duration::from_secs(30));
        assert_eq!(config.score_window, 10);
        assert_eq!(config.event_retention, Duration::from_secs(3600));
        assert_eq!(config.intermittent_threshold, 2);
    }

    #[test]
    fn test_default_preload_config() {
        let config = PreloadConfig::default();
        assert_eq!(config.max_concurrent_preloads, 2);
        assert_eq!(config.quality_threshold, 0.4);
        assert_eq!(config.budget_window, Duration::from_millis(10_000));
        assert!(config.budget_share > 0.0 && config.budget_share < 1.0);
    }

    #[test]
    fn test_priority_weights_ordering() {
        let weights = PriorityWeights::default();
        assert!(weights.weight(Priority::Critical) > weights.weight(Priority::High));
        assert!(weights.weight(Priority::High) > weights.weight(Priority::Normal));
        assert!(weights.weight(Priority::Normal) > weights.weight(Priority::Low));
    }

    #[test]
    fn test_reason_weights_lookup() {
        let weights = ReasonWeights::default();
        assert_eq!(weights.weight(ReasonTag::Viewport), 3.0);
        assert_eq!(weights.weight(ReasonTag::Pattern), 1.0);
    }

    #[test]
    fn test_default_connectivity_config() {
        let config = ConnectivityConfig::default();
        assert!(!config.cache_first);
        assert!(config.priority_eviction);
        assert!(config.background_sync);
        assert_eq!(config.retry_strategy, RetryStrategy::Exponential);
        assert_eq!(config.max_cache_size, 50 * 1024 * 1024);
    }

    #[test]
    fn test_aggressiveness_profiles() {
        assert!(
            Aggressiveness::Conservative.quality_threshold()
                > Aggressiveness::Aggressive.quality_threshold()
        );
        assert!(
            Aggressiveness::Aggressive.max_concurrent_preloads()
                > Aggressiveness::Conservative.max_concurrent_preloads()
        );
        assert_eq!(
            Aggressiveness::Balanced.quality_threshold(),
            DEFAULT_QUALITY_THRESHOLD
        );
    }

    #[test]
    fn test_adaptation_update_leaves_unset_fields_alone() {
        let mut config = AdaptationConfig::default();
        AdaptationConfigUpdate {
            aggressiveness: Some(Aggressiveness::Aggressive),
            ..Default::default()
        }
        .apply_to(&mut config);

        assert_eq!(config.aggressiveness, Aggressiveness::Aggressive);
        assert!(config.priority_boosting);
        assert!(config.dynamic_timeouts);
    }

    #[test]
    fn test_loader_config_default_is_complete() {
        let config = LoaderConfig::default();
        assert_eq!(config.adaptation.aggressiveness, Aggressiveness::Balanced);
        assert!(config.adaptation.dynamic_timeouts);
    }
}
