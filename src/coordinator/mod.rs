//! Cross-component adaptation.
//!
//! # Module Structure
//!
//! ```text
//! coordinator/
//! ├── recommendation.rs  # per-load advice derivation
//! └── core.rs            # AdaptationCoordinator component
//! ```

mod core;
mod recommendation;

pub use self::core::{AdaptationCoordinator, LoaderMetrics};
pub use recommendation::{
    derive_recommendation, priority_timeout_factor, LoadingRecommendation, RecommendationReason,
    GOOD_SCORE, MAX_RECOMMENDED_TIMEOUT_MS,
};
