//! Scored preload queue.
//!
//! Requests are ordered by a composite score of priority, reason,
//! confidence, size and deadline urgency. Ordering is re-evaluated at every
//! selection rather than frozen at enqueue time, because urgency grows as a
//! deadline approaches. Ties break by insertion sequence (FIFO), following
//! the sequence-counter approach used for priority queues elsewhere in the
//! ecosystem.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::{PriorityWeights, ReasonWeights};
use crate::preload::request::PreloadRequest;

/// Horizon over which deadline urgency ramps from 0 to its maximum.
pub const URGENCY_HORIZON: Duration = Duration::from_secs(300);

/// Maximum urgency bonus, reached as the deadline arrives.
pub const URGENCY_MAX: f64 = 15.0;

/// Composite queue score for a request at a point in time.
///
/// `priority×10 + reason×5 + confidence×10 − ln(size_kb)×2 + urgency`.
/// Sub-kilobyte sizes incur no penalty (the log term is floored at zero).
pub fn request_score(
    request: &PreloadRequest,
    priority_weights: &PriorityWeights,
    reason_weights: &ReasonWeights,
    now: Instant,
) -> f64 {
    let priority_term = priority_weights.weight(request.priority) * 10.0;
    let reason_term = reason_weights.weight(request.reason) * 5.0;
    let confidence_term = request.confidence * 10.0;
    let size_kb = (request.estimated_size_bytes as f64 / 1000.0).max(1.0);
    let size_penalty = size_kb.ln() * 2.0;
    let urgency = match request.deadline {
        None => 0.0,
        Some(deadline) => {
            let remaining = deadline.saturating_duration_since(now);
            if remaining >= URGENCY_HORIZON {
                0.0
            } else {
                URGENCY_MAX * (1.0 - remaining.as_secs_f64() / URGENCY_HORIZON.as_secs_f64())
            }
        }
    };

    priority_term + reason_term + confidence_term - size_penalty + urgency
}

#[derive(Debug)]
struct QueuedPreload {
    request: PreloadRequest,
    sequence: u64,
}

/// Queue of pending preload requests. Unbounded; backpressure comes from
/// the dispatch gates, not the queue.
///
/// Not thread-safe; the preloader wraps it in its state mutex.
#[derive(Debug, Default)]
pub struct PreloadQueue {
    entries: Vec<QueuedPreload>,
    next_sequence: u64,
}

impl PreloadQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a request.
    ///
    /// Returns `false` (a no-op) if a request for the same resource id is
    /// already queued.
    pub fn push(&mut self, request: PreloadRequest) -> bool {
        if self.contains(&request.resource_id) {
            return false;
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.push(QueuedPreload { request, sequence });
        true
    }

    /// True if a request for the id is queued.
    pub fn contains(&self, resource_id: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.request.resource_id == resource_id)
    }

    /// Remove a queued request by id.
    pub fn remove(&mut self, resource_id: &str) -> Option<PreloadRequest> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.request.resource_id == resource_id)?;
        Some(self.entries.swap_remove(idx).request)
    }

    /// Remove and return every request whose deadline has passed.
    pub fn drain_expired(&mut self, now: Instant) -> Vec<PreloadRequest> {
        let mut expired = Vec::new();
        self.entries.retain_mut(|e| {
            if e.request.is_expired(now) {
                expired.push(e.request.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    fn best_index(
        &self,
        priority_weights: &PriorityWeights,
        reason_weights: &ReasonWeights,
        now: Instant,
    ) -> Option<usize> {
        let mut best: Option<(usize, f64, u64)> = None;
        for (idx, entry) in self.entries.iter().enumerate() {
            let score = request_score(&entry.request, priority_weights, reason_weights, now);
            let better = match best {
                None => true,
                Some((_, best_score, best_seq)) => {
                    score > best_score || (score == best_score && entry.sequence < best_seq)
                }
            };
            if better {
                best = Some((idx, score, entry.sequence));
            }
        }
        best.map(|(idx, _, _)| idx)
    }

    /// The highest-scoring request, without removing it.
    pub fn peek_best(
        &self,
        priority_weights: &PriorityWeights,
        reason_weights: &ReasonWeights,
        now: Instant,
    ) -> Option<&PreloadRequest> {
        self.best_index(priority_weights, reason_weights, now)
            .map(|idx| &self.entries[idx].request)
    }

    /// Remove and return the highest-scoring request.
    pub fn pop_best(
        &mut self,
        priority_weights: &PriorityWeights,
        reason_weights: &ReasonWeights,
        now: Instant,
    ) -> Option<PreloadRequest> {
        let idx = self.best_index(priority_weights, reason_weights, now)?;
        Some(self.entries.remove(idx).request)
    }

    /// Number of queued requests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all queued requests.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
