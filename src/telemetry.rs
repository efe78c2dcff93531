//! Network telemetry readings and the telemetry source capability.
//!
//! A [`NetworkReading`] is an immutable snapshot of link conditions supplied
//! by the host (browser connection API, OS network info, probes). The
//! [`TelemetrySource`] trait is pull-based; online/offline transitions are
//! pushed to the quality monitor directly via
//! [`QualityMonitor::set_online`](crate::monitor::QualityMonitor::set_online).
//!
//! When no telemetry is available the monitor falls back to
//! [`NetworkReading::fallback`] rather than failing, so telemetry loss
//! never breaks loading.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fallback downlink when telemetry is unavailable, in Mbps.
pub const FALLBACK_DOWNLINK_MBPS: f64 = 10.0;

/// Fallback round-trip time when telemetry is unavailable, in milliseconds.
pub const FALLBACK_RTT_MS: f64 = 100.0;

/// Coarse effective connection class, as reported by the host telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectiveClass {
    /// Very slow 2G-class link.
    #[serde(rename = "slow-2g")]
    Slow2g,
    /// 2G-class link.
    #[serde(rename = "2g")]
    TwoG,
    /// 3G-class link.
    #[serde(rename = "3g")]
    ThreeG,
    /// 4G-class link or better.
    #[serde(rename = "4g")]
    FourG,
}

impl EffectiveClass {
    /// Normalized quality weight for this class, in [0, 1].
    ///
    /// One of the three multiplicative factors of the quality score.
    pub fn weight(self) -> f64 {
        match self {
            EffectiveClass::Slow2g => 0.2,
            EffectiveClass::TwoG => 0.45,
            EffectiveClass::ThreeG => 0.7,
            EffectiveClass::FourG => 1.0,
        }
    }

    /// Display string matching the wire names of the host telemetry API.
    pub fn as_str(self) -> &'static str {
        match self {
            EffectiveClass::Slow2g => "slow-2g",
            EffectiveClass::TwoG => "2g",
            EffectiveClass::ThreeG => "3g",
            EffectiveClass::FourG => "4g",
        }
    }
}

impl fmt::Display for EffectiveClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable snapshot of current link conditions.
///
/// Replaced wholesale on change; never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkReading {
    /// Coarse connection class.
    pub effective_class: EffectiveClass,
    /// Estimated downlink bandwidth in Mbps (≥ 0).
    pub downlink_mbps: f64,
    /// Estimated round-trip time in milliseconds (≥ 0).
    pub rtt_ms: f64,
    /// User has requested reduced data usage.
    pub save_data: bool,
}

impl NetworkReading {
    /// Create a reading, clamping negative measurements to zero.
    pub fn new(effective_class: EffectiveClass, downlink_mbps: f64, rtt_ms: f64) -> Self {
        Self {
            effective_class,
            downlink_mbps: downlink_mbps.max(0.0),
            rtt_ms: rtt_ms.max(0.0),
            save_data: false,
        }
    }

    /// Set the save-data flag.
    pub fn with_save_data(mut self, save_data: bool) -> Self {
        self.save_data = save_data;
        self
    }

    /// The fixed reading used when telemetry is unavailable.
    ///
    /// A healthy 4G-class link: assuming the worst would disable preloading
    /// for every host without telemetry support.
    pub fn fallback() -> Self {
        Self::new(
            EffectiveClass::FourG,
            FALLBACK_DOWNLINK_MBPS,
            FALLBACK_RTT_MS,
        )
    }
}

impl Default for NetworkReading {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Source of network telemetry readings.
///
/// `None` means telemetry is currently unavailable; the monitor substitutes
/// the fallback reading.
pub trait TelemetrySource: Send + Sync {
    /// The current reading, if telemetry is available.
    fn current_reading(&self) -> Option<NetworkReading>;
}

/// Telemetry source backed by a settable value.
///
/// Hosts that receive readings via callbacks can push them here; tests use
/// it to script network conditions.
#[derive(Debug, Default)]
pub struct StaticTelemetry {
    reading: Mutex<Option<NetworkReading>>,
}

impl StaticTelemetry {
    /// Create a source with no reading (monitor will use the fallback).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source with an initial reading.
    pub fn with_reading(reading: NetworkReading) -> Self {
        Self {
            reading: Mutex::new(Some(reading)),
        }
    }

    /// Replace the current reading.
    pub fn set_reading(&self, reading: NetworkReading) {
        *self.reading.lock() = Some(reading);
    }

    /// Mark telemetry as unavailable.
    pub fn clear(&self) {
        *self.reading.lock() = None;
    }
}

impl TelemetrySource for StaticTelemetry {
    fn current_reading(&self) -> Option<NetworkReading> {
        *self.reading.lock()
    }
}

/// Telemetry source that is never available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTelemetry;

impl TelemetrySource for NoTelemetry {
    fn current_reading(&self) -> Option<NetworkReading> {
        None
    }
}
