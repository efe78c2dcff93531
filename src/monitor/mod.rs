//! Network quality monitoring.
//!
//! The leaf component of the adaptive loading core: turns noisy,
//! low-frequency telemetry readings into a stable quality estimate and a
//! small set of discrete connection events.
//!
//! # Module Structure
//!
//! ```text
//! monitor/
//! ├── metrics.rs    # quality score + stability window
//! ├── event.rs      # ConnectionEvent and retained history
//! ├── strategy.rs   # AdaptationStrategy band table
//! └── quality.rs    # QualityMonitor component
//! ```

mod event;
mod metrics;
mod quality;
mod strategy;

pub use event::{ConnectionEvent, ConnectionEventKind, EventHistory};
pub use metrics::{
    quality_score, QualityMetrics, ScoreWindow, DOWNLINK_REFERENCE_MBPS, RTT_PENALTY_RANGE_MS,
    RTT_REFERENCE_MS,
};
pub use quality::{QualityMonitor, RELIABLE_SCORE, RELIABLE_STABILITY, SCORE_SWING_THRESHOLD};
pub use strategy::{
    AdaptationStrategy, EXCELLENT_SCORE_BAND, FAIR_SCORE_BAND, POOR_SCORE_BAND,
    UNSTABLE_STABILITY,
};
