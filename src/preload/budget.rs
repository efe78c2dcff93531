//! Bandwidth budget for speculative dispatch.
//!
//! A heuristic sliding-window approximation, not a traffic shaper: a
//! dispatch debits its estimated size, and the same amount is credited
//! back one window later. The budget tracks `total` and `reserved`;
//! `available` is always derived as `total − reserved`, so the invariant
//! `available ≤ total` holds by construction and the budget can never go
//! negative. Overlapping windows can over- or under-count; no stronger
//! guarantee is promised.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bytes per second per Mbps.
const BYTES_PER_SEC_PER_MBPS: f64 = 125_000.0;

/// Serializable view of the budget for stats reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    /// Total reservable bytes per window.
    pub total_bytes: u64,
    /// Bytes currently available for dispatch.
    pub available_bytes: u64,
    /// Bytes reserved by outstanding dispatches.
    pub reserved_bytes: u64,
    /// Window length in milliseconds.
    pub window_ms: u64,
}

/// Preload bandwidth budget.
#[derive(Debug, Clone)]
pub struct BandwidthBudget {
    total: u64,
    reserved: u64,
    window: Duration,
}

impl BandwidthBudget {
    /// Create a budget sized for the given downlink.
    pub fn new(downlink_mbps: f64, share: f64, window: Duration) -> Self {
        let mut budget = Self {
            total: 0,
            reserved: 0,
            window,
        };
        budget.recompute(downlink_mbps, share);
        budget
    }

    /// Resize the budget for a new reading.
    ///
    /// Outstanding reservations are preserved; if the link shrank below
    /// what is already reserved, `available` bottoms out at zero until
    /// credits return.
    pub fn recompute(&mut self, downlink_mbps: f64, share: f64) {
        let total = downlink_mbps.max(0.0)
            * BYTES_PER_SEC_PER_MBPS
            * self.window.as_secs_f64()
            * share.clamp(0.0, 1.0);
        self.total = total as u64;
    }

    /// Bytes currently available for dispatch.
    pub fn available(&self) -> u64 {
        self.total.saturating_sub(self.reserved)
    }

    /// Total reservable bytes per window.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// The budget window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Reserve `size` bytes for a dispatch.
    ///
    /// Returns `false` without reserving when the request does not fit.
    pub fn debit(&mut self, size: u64) -> bool {
        if size > self.available() {
            return false;
        }
        self.reserved += size;
        true
    }

    /// Return `size` bytes to the budget, one window after dispatch.
    pub fn credit(&mut self, size: u64) {
        self.reserved = self.reserved.saturating_sub(size);
    }

    /// Current snapshot for stats reporting.
    pub fn snapshot(&self) -> BudgetSnapshot {
        BudgetSnapshot {
            total_bytes: self.total,
            available_bytes: self.available(),
            reserved_bytes: self.reserved,
            window_ms: self.window.as_millis() as u64,
        }
    }
}
