//! Speculative preload requests.

use tokio::time::Instant;

use crate::types::{Priority, ReasonTag};

/// A speculative load request.
///
/// Lifecycle: created by the caller → queued → dispatched → settled, with
/// expiry as an absorbing state if the deadline passes while still queued.
/// At most one live request exists per resource id; duplicates are no-ops.
#[derive(Debug, Clone)]
pub struct PreloadRequest {
    /// Resource to preload.
    pub resource_id: String,
    /// Request priority.
    pub priority: Priority,
    /// Estimated payload size in bytes, used for budget accounting.
    pub estimated_size_bytes: u64,
    /// Signal that produced this request.
    pub reason: ReasonTag,
    /// Confidence the resource will actually be needed, in [0, 1].
    pub confidence: f64,
    /// Drop the request if still queued past this instant.
    pub deadline: Option<Instant>,
}

impl PreloadRequest {
    /// Create a request, clamping confidence into [0, 1].
    pub fn new(
        resource_id: impl Into<String>,
        priority: Priority,
        reason: ReasonTag,
        confidence: f64,
        estimated_size_bytes: u64,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            priority,
            estimated_size_bytes,
            reason,
            confidence: confidence.clamp(0.0, 1.0),
            deadline: None,
        }
    }

    /// Set a deadline after which a still-queued request expires.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// True if the deadline has passed.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| d < now)
    }
}
