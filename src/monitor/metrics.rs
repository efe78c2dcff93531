//! Quality score and stability computation.
//!
//! The quality score is a multiplicative composition of three normalized
//! factors of the current reading: connection-class weight, downlink against
//! a 10 Mbps reference, and RTT against a 100 ms reference. Stability is the
//! inverse of the standard deviation of the most recent scores.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::telemetry::NetworkReading;

/// Downlink bandwidth that maps to a full throughput factor, in Mbps.
pub const DOWNLINK_REFERENCE_MBPS: f64 = 10.0;

/// RTT at or below which no latency penalty applies, in milliseconds.
pub const RTT_REFERENCE_MS: f64 = 100.0;

/// RTT range over which the linear latency penalty falls to zero, in
/// milliseconds. A 1100 ms round trip scores a zero latency factor.
pub const RTT_PENALTY_RANGE_MS: f64 = 1000.0;

/// Derived network quality estimate.
///
/// Recomputed on every assessment tick and on every reading change.
/// All normalized fields are in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Composite link quality, 0 = unusable, 1 = excellent.
    pub score: f64,
    /// Inverse of recent score variance, 0 = erratic, 1 = steady.
    pub stability: f64,
    /// Round-trip time from the underlying reading, in milliseconds.
    pub latency_ms: f64,
    /// Downlink bandwidth from the underlying reading, in Mbps.
    pub bandwidth_mbps: f64,
    /// Estimated packet loss fraction.
    ///
    /// The telemetry sources this core consumes do not report loss
    /// directly; this is a proxy derived from score instability.
    pub packet_loss: f64,
}

impl QualityMetrics {
    /// Metrics for a link that has never been assessed.
    pub fn unassessed() -> Self {
        Self {
            score: 0.0,
            stability: 1.0,
            latency_ms: 0.0,
            bandwidth_mbps: 0.0,
            packet_loss: 0.0,
        }
    }
}

/// Compute the composite quality score for a reading.
///
/// `class_weight × throughput_factor × latency_factor`, each factor
/// normalized to [0, 1], so the product is guaranteed to stay in [0, 1].
pub fn quality_score(reading: &NetworkReading) -> f64 {
    let class_factor = reading.effective_class.weight();
    let throughput_factor = (reading.downlink_mbps / DOWNLINK_REFERENCE_MBPS).min(1.0);
    let latency_factor = if reading.rtt_ms <= RTT_REFERENCE_MS {
        1.0
    } else {
        (1.0 - (reading.rtt_ms - RTT_REFERENCE_MS) / RTT_PENALTY_RANGE_MS).clamp(0.0, 1.0)
    };

    (class_factor * throughput_factor * latency_factor).clamp(0.0, 1.0)
}

/// Rolling window of recent quality scores.
///
/// Holds at most `capacity` samples; stability is `1 − stddev` over the
/// window, clamped to [0, 1]. With fewer than two samples the link is
/// considered fully stable.
#[derive(Debug, Clone)]
pub struct ScoreWindow {
    scores: VecDeque<f64>,
    capacity: usize,
}

impl ScoreWindow {
    /// Create a window holding at most `capacity` scores.
    pub fn new(capacity: usize) -> Self {
        Self {
            scores: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    /// Record a score, evicting the oldest when full.
    pub fn push(&mut self, score: f64) {
        if self.scores.len() == self.capacity {
            self.scores.pop_front();
        }
        self.scores.push_back(score);
    }

    /// Number of recorded scores.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// True if no scores have been recorded.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Most recent score, if any.
    pub fn latest(&self) -> Option<f64> {
        self.scores.back().copied()
    }

    /// Stability over the window: `clamp(1 − stddev, 0, 1)`.
    ///
    /// Uses the sample standard deviation (n−1 denominator) so that a
    /// window of wildly swinging scores can actually cross the unstable
    /// threshold; the population form tops out at 0.5 for unit-range data.
    pub fn stability(&self) -> f64 {
        if self.scores.len() < 2 {
            return 1.0;
        }
        let n = self.scores.len() as f64;
        let mean = self.scores.iter().sum::<f64>() / n;
        let variance = self
            .scores
            .iter()
            .map(|s| (s - mean).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        (1.0 - variance.sqrt()).clamp(0.0, 1.0)
    }

    /// Drop all recorded scores.
    pub fn clear(&mut self) {
        self.scores.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::EffectiveClass;
    use proptest::prelude::*;

    #[test]
    fn test_score_excellent_link() {
        // A healthy 4g link (10 Mbps, 50 ms) must score above 0.8.
        let reading = NetworkReading::new(EffectiveClass::FourG, 10.0, 50.0);
        let score = quality_score(&reading);
        assert!(score > 0.8, "expected > 0.8, got {}", score);
    }

    #[test]
    fn test_score_terrible_link() {
        let reading =
            NetworkReading::new(EffectiveClass::Slow2g, 0.3, 2000.0).with_save_data(true);
        let score = quality_score(&reading);
        assert!(score < 0.3, "expected < 0.3, got {}", score);
    }

    #[test]
    fn test_score_no_latency_penalty_at_reference() {
        let at_ref = NetworkReading::new(EffectiveClass::FourG, 10.0, 100.0);
        let below_ref = NetworkReading::new(EffectiveClass::FourG, 10.0, 10.0);
        assert_eq!(quality_score(&at_ref), quality_score(&below_ref));
        assert_eq!(quality_score(&at_ref), 1.0);
    }

    #[test]
    fn test_score_downlink_capped_at_reference() {
        let at_ref = NetworkReading::new(EffectiveClass::FourG, 10.0, 50.0);
        let above_ref = NetworkReading::new(EffectiveClass::FourG, 100.0, 50.0);
        assert_eq!(quality_score(&at_ref), quality_score(&above_ref));
    }

    #[test]
    fn test_score_latency_floor() {
        // Beyond the penalty range the latency factor bottoms out at zero.
        let reading = NetworkReading::new(EffectiveClass::FourG, 10.0, 5000.0);
        assert_eq!(quality_score(&reading), 0.0);
    }

    proptest! {
        #[test]
        fn prop_score_always_in_unit_range(
            class_idx in 0usize..4,
            downlink in 0.0f64..10_000.0,
            rtt in 0.0f64..60_000.0,
        ) {
            let class = [
                EffectiveClass::Slow2g,
                EffectiveClass::TwoG,
                EffectiveClass::ThreeG,
                EffectiveClass::FourG,
            ][class_idx];
            let score = quality_score(&NetworkReading::new(class, downlink, rtt));
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn prop_stability_always_in_unit_range(scores in proptest::collection::vec(0.0f64..=1.0, 0..30)) {
            let mut window = ScoreWindow::new(10);
            for s in scores {
                window.push(s);
            }
            let stability = window.stability();
            prop_assert!((0.0..=1.0).contains(&stability));
        }
    }

    #[test]
    fn test_window_caps_at_capacity() {
        let mut window = ScoreWindow::new(10);
        for i in 0..25 {
            window.push(i as f64 / 25.0);
        }
        assert_eq!(window.len(), 10);
        assert_eq!(window.latest(), Some(24.0 / 25.0));
    }

    #[test]
    fn test_stability_of_constant_scores() {
        let mut window = ScoreWindow::new(10);
        for _ in 0..10 {
            window.push(0.7);
        }
        // Accumulated float error leaves the stddev a hair above zero.
        assert!((window.stability() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_stability_drops_with_variance() {
        let mut steady = ScoreWindow::new(10);
        let mut erratic = ScoreWindow::new(10);
        for i in 0..10 {
            steady.push(0.8);
            erratic.push(if i % 2 == 0 { 0.1 } else { 0.9 });
        }
        assert!(erratic.stability() < steady.stability());
        assert!(erratic.stability() < 0.7);
    }

    #[test]
    fn test_single_sample_is_stable() {
        let mut window = ScoreWindow::new(10);
        window.push(0.5);
        assert_eq!(window.stability(), 1.0);
    }
}
