//! Connectivity state snapshot types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where the handler stands in its reconnection machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconnectionPhase {
    /// Online with no recovery in progress.
    StableOnline,
    /// Offline, waiting for the next reconnection attempt.
    Offline,
    /// An attempt is being evaluated.
    Reconnecting,
}

impl std::fmt::Display for ReconnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReconnectionPhase::StableOnline => "stable-online",
            ReconnectionPhase::Offline => "offline",
            ReconnectionPhase::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of the connectivity handler.
#[derive(Debug, Clone, Copy)]
pub struct ConnectivityState {
    /// Reconnection machine phase.
    pub phase: ReconnectionPhase,
    /// Whether the handler currently considers the host online.
    pub online: bool,
    /// Time spent offline so far; zero while online.
    pub offline_duration: Duration,
    /// Failed reconnection attempts in the current outage.
    pub reconnect_attempts: u32,
    /// Whether loads currently consult the cache before the network.
    pub cache_first_active: bool,
    /// Resources queued for refresh after reconnection.
    pub pending_sync: usize,
}
