//! Loading recommendation derivation.
//!
//! Turns the monitor's current view into concrete advice for a single load:
//! whether to consult the cache first, whether speculative preloading is
//! worthwhile, and what timeout and retry allowance to use. Rules are
//! evaluated in order, worst conditions first.

use serde::{Deserialize, Serialize};

use crate::config::AdaptationConfig;
use crate::monitor::{QualityMetrics, POOR_SCORE_BAND, UNSTABLE_STABILITY};
use crate::types::{LoadContext, Priority};

/// Score above which the link is good enough to encourage preloading.
pub const GOOD_SCORE: f64 = 0.7;

/// Ceiling on any recommended timeout, in milliseconds.
pub const MAX_RECOMMENDED_TIMEOUT_MS: u64 = 30_000;

/// Which rule produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationReason {
    /// The host is offline.
    Offline,
    /// Quality score below the poor band.
    PoorQuality,
    /// Offline/unstable events have clustered recently.
    Intermittent,
    /// Fast and steady link.
    GoodQuality,
    /// None of the special cases applied.
    Baseline,
}

/// Advice for loading one resource under current conditions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadingRecommendation {
    /// Consult the cache before the network.
    pub use_cache_first: bool,
    /// Speculative preloading is worthwhile right now.
    pub should_preload: bool,
    /// Suggested fetch timeout in milliseconds.
    pub timeout_ms: u64,
    /// Suggested retry allowance.
    pub max_retries: u32,
    /// The rule that fired.
    pub reason: RecommendationReason,
}

/// Derive a recommendation from monitor state, first matching rule wins.
///
/// Critical and high priority requests never get a preload recommendation
/// on a good link; they should be loaded immediately instead.
pub fn derive_recommendation(
    online: bool,
    intermittent: bool,
    metrics: &QualityMetrics,
    priority: Priority,
    context: &LoadContext,
    options: &AdaptationConfig,
) -> LoadingRecommendation {
    let base = if !online {
        LoadingRecommendation {
            use_cache_first: true,
            should_preload: false,
            timeout_ms: 10_000,
            max_retries: 0,
            reason: RecommendationReason::Offline,
        }
    } else if metrics.score < POOR_SCORE_BAND {
        LoadingRecommendation {
            use_cache_first: true,
            should_preload: false,
            timeout_ms: 20_000,
            max_retries: 1,
            reason: RecommendationReason::PoorQuality,
        }
    } else if intermittent {
        LoadingRecommendation {
            use_cache_first: true,
            should_preload: false,
            timeout_ms: 15_000,
            max_retries: 2,
            reason: RecommendationReason::Intermittent,
        }
    } else if metrics.score > GOOD_SCORE && metrics.stability >= UNSTABLE_STABILITY {
        LoadingRecommendation {
            use_cache_first: false,
            should_preload: context.authorizes_preload() && priority < Priority::High,
            timeout_ms: 8_000,
            max_retries: 3,
            reason: RecommendationReason::GoodQuality,
        }
    } else {
        LoadingRecommendation {
            use_cache_first: false,
            should_preload: false,
            timeout_ms: 10_000,
            max_retries: 3,
            reason: RecommendationReason::Baseline,
        }
    };

    scale_timeout(base, metrics, priority, options)
}

fn scale_timeout(
    mut recommendation: LoadingRecommendation,
    metrics: &QualityMetrics,
    priority: Priority,
    options: &AdaptationConfig,
) -> LoadingRecommendation {
    let mut timeout = recommendation.timeout_ms as f64;
    if options.dynamic_timeouts {
        timeout *= (metrics.latency_ms / 100.0).max(1.0);
    }
    if options.priority_boosting {
        timeout *= priority_timeout_factor(priority);
    }
    recommendation.timeout_ms = (timeout as u64).min(MAX_RECOMMENDED_TIMEOUT_MS);
    recommendation
}

/// Per-priority timeout scaling; critical requests fail fastest.
pub fn priority_timeout_factor(priority: Priority) -> f64 {
    match priority {
        Priority::Critical => 0.5,
        Priority::High => 0.75,
        Priority::Normal => 1.0,
        Priority::Low => 1.5,
    }
}
