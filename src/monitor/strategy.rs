//! Adaptation strategy table.
//!
//! A deterministic mapping from the current quality band, save-data flag
//! and stability to coarse-grained behavior: concurrency caps, timeout
//! multipliers and per-priority boost factors. This table is the canonical
//! source the preloader, handler and coordinator consult; none of them
//! re-derive band thresholds on their own.

use serde::{Deserialize, Serialize};

use crate::monitor::metrics::QualityMetrics;
use crate::types::Priority;

/// Score below which the link is treated as poor.
pub const POOR_SCORE_BAND: f64 = 0.3;

/// Score below which the link is treated as fair.
pub const FAIR_SCORE_BAND: f64 = 0.6;

/// Score above which the link is treated as excellent.
pub const EXCELLENT_SCORE_BAND: f64 = 0.8;

/// Stability below which the strategy turns cautious.
pub const UNSTABLE_STABILITY: f64 = 0.5;

/// Concurrency cap applied when save-data is requested.
const SAVE_DATA_CONCURRENCY_CAP: usize = 2;

/// Coarse-grained behavior recommendation derived from current quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptationStrategy {
    /// Cap on concurrently outstanding loads.
    pub max_concurrent_loads: usize,
    /// Multiplier applied to base timeouts.
    pub timeout_multiplier: f64,
    /// Whether speculative preloading is advisable at all.
    pub allow_preload: bool,
}

impl AdaptationStrategy {
    /// Derive the strategy for the given metrics and save-data flag.
    ///
    /// Band thresholds: poor < 0.3 ≤ fair < 0.6 ≤ good ≤ 0.8 < excellent.
    /// Save-data caps concurrency and disables preloading. Low stability
    /// costs one concurrency slot and half a timeout multiplier step.
    pub fn derive(metrics: &QualityMetrics, save_data: bool) -> Self {
        let (mut max_concurrent_loads, mut timeout_multiplier, mut allow_preload) =
            if metrics.score < POOR_SCORE_BAND {
                (1, 2.5, false)
            } else if metrics.score < FAIR_SCORE_BAND {
                (2, 1.5, false)
            } else if metrics.score <= EXCELLENT_SCORE_BAND {
                (4, 1.0, true)
            } else {
                (6, 0.8, true)
            };

        if metrics.stability < UNSTABLE_STABILITY {
            max_concurrent_loads = (max_concurrent_loads - 1).max(1);
            timeout_multiplier += 0.5;
        }

        if save_data {
            max_concurrent_loads = max_concurrent_loads.min(SAVE_DATA_CONCURRENCY_CAP);
            allow_preload = false;
        }

        Self {
            max_concurrent_loads,
            timeout_multiplier,
            allow_preload,
        }
    }

    /// Boost factor for the given priority.
    ///
    /// Consumed by the coordinator when priority boosting is enabled.
    pub fn priority_boost(priority: Priority) -> f64 {
        match priority {
            Priority::Critical => 2.0,
            Priority::High => 1.5,
            Priority::Normal => 1.0,
            Priority::Low => 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(score: f64, stability: f64) -> QualityMetrics {
        QualityMetrics {
            score,
            stability,
            latency_ms: 100.0,
            bandwidth_mbps: 10.0,
            packet_loss: 0.0,
        }
    }

    #[test]
    fn test_excellent_band_allows_six_loads() {
        // Score > 0.8 lands in the top band: six loads, shorter timeouts.
        let strategy = AdaptationStrategy::derive(&metrics(0.9, 1.0), false);
        assert_eq!(strategy.max_concurrent_loads, 6);
        assert_eq!(strategy.timeout_multiplier, 0.8);
        assert!(strategy.allow_preload);
    }

    #[test]
    fn test_poor_band_is_single_load() {
        let strategy = AdaptationStrategy::derive(&metrics(0.1, 1.0), false);
        assert_eq!(strategy.max_concurrent_loads, 1);
        assert_eq!(strategy.timeout_multiplier, 2.5);
        assert!(!strategy.allow_preload);
    }

    #[test]
    fn test_fair_band() {
        let strategy = AdaptationStrategy::derive(&metrics(0.45, 1.0), false);
        assert_eq!(strategy.max_concurrent_loads, 2);
        assert!(!strategy.allow_preload);
    }

    #[test]
    fn test_good_band() {
        let strategy = AdaptationStrategy::derive(&metrics(0.7, 1.0), false);
        assert_eq!(strategy.max_concurrent_loads, 4);
        assert_eq!(strategy.timeout_multiplier, 1.0);
        assert!(strategy.allow_preload);
    }

    #[test]
    fn test_save_data_caps_concurrency_and_preload() {
        let strategy = AdaptationStrategy::derive(&metrics(0.9, 1.0), true);
        assert_eq!(strategy.max_concurrent_loads, 2);
        assert!(!strategy.allow_preload);
    }

    #[test]
    fn test_instability_penalty() {
        let stable = AdaptationStrategy::derive(&metrics(0.9, 1.0), false);
        let unstable = AdaptationStrategy::derive(&metrics(0.9, 0.3), false);
        assert_eq!(
            unstable.max_concurrent_loads,
            stable.max_concurrent_loads - 1
        );
        assert!(unstable.timeout_multiplier > stable.timeout_multiplier);
    }

    #[test]
    fn test_instability_never_drops_below_one_load() {
        let strategy = AdaptationStrategy::derive(&metrics(0.1, 0.0), false);
        assert_eq!(strategy.max_concurrent_loads, 1);
    }

    #[test]
    fn test_priority_boost_factors() {
        assert_eq!(AdaptationStrategy::priority_boost(Priority::Critical), 2.0);
        assert_eq!(AdaptationStrategy::priority_boost(Priority::Low), 0.5);
        assert!(
            AdaptationStrategy::priority_boost(Priority::High)
                > AdaptationStrategy::priority_boost(Priority::Normal)
        );
    }
}
