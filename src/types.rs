//! Shared vocabulary for load requests.
//!
//! These types flow through every component: the preloader scores requests
//! by priority and reason, the cache evicts by priority, and the coordinator
//! folds priority and context into loading recommendations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Priority of a load or preload request.
///
/// Ordering follows urgency: `Critical` is greatest. The cache evicts
/// lowest-priority entries first; the coordinator fails critical loads
/// fastest so callers can fall back quickly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Background or opportunistic work, evicted and deferred first.
    Low,
    /// Default priority for routine loads.
    Normal,
    /// Needed soon; boosted in queue ordering.
    High,
    /// Must load eagerly; never preloaded speculatively.
    Critical,
}

impl Priority {
    /// All priorities, lowest first.
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Normal,
        Priority::High,
        Priority::Critical,
    ];

    /// Short display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a speculative preload was requested.
///
/// Upstream analysis tags each preload with the signal that produced it;
/// the preloader weights these differently when ordering its queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasonTag {
    /// Resource is entering the viewport.
    Viewport,
    /// User interaction suggests the resource is about to be needed.
    Interaction,
    /// Navigation is predicted to require the resource.
    Navigation,
    /// Usage-pattern analysis flagged the resource.
    Pattern,
}

impl ReasonTag {
    /// Short display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonTag::Viewport => "viewport",
            ReasonTag::Interaction => "interaction",
            ReasonTag::Navigation => "navigation",
            ReasonTag::Pattern => "pattern",
        }
    }
}

impl fmt::Display for ReasonTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Caller-supplied context for a load intent.
///
/// Each hint independently authorizes speculative preloading when network
/// quality is good; none of them force it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadContext {
    /// The resource is visible or about to become visible.
    pub in_viewport: bool,
    /// A user interaction referenced the resource.
    pub user_interaction: bool,
    /// Route prediction expects the resource on an upcoming navigation.
    pub navigation_hint: bool,
}

impl LoadContext {
    /// Context with no hints set.
    pub fn none() -> Self {
        Self::default()
    }

    /// True if any preload-authorizing hint is present.
    pub fn authorizes_preload(&self) -> bool {
        self.in_viewport || self.user_interaction || self.navigation_hint
    }

    /// Derive a context from a preload reason tag.
    ///
    /// Used by the coordinator when a preload request arrives with a reason
    /// instead of an explicit context.
    pub fn from_reason(reason: ReasonTag) -> Self {
        match reason {
            ReasonTag::Viewport => Self {
                in_viewport: true,
                ..Self::default()
            },
            ReasonTag::Interaction => Self {
                user_interaction: true,
                ..Self::default()
            },
            ReasonTag::Navigation => Self {
                navigation_hint: true,
                ..Self::default()
            },
            ReasonTag::Pattern => Self::default(),
        }
    }
}
