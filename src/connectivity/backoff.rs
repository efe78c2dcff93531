//! Reconnection backoff strategies.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Longest delay any strategy will wait between reconnection attempts.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Delay schedule between reconnection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategy {
    /// Retry every second.
    Immediate,
    /// Delay grows linearly with the attempt count.
    Linear,
    /// Delay doubles with each attempt.
    Exponential,
}

impl RetryStrategy {
    /// Delay before the next attempt, given how many have already failed.
    ///
    /// All schedules cap at [`MAX_RETRY_DELAY`].
    pub fn delay(self, attempts: u32) -> Duration {
        let delay = match self {
            RetryStrategy::Immediate => Duration::from_secs(1),
            RetryStrategy::Linear => Duration::from_secs(u64::from(attempts) * 2),
            RetryStrategy::Exponential => {
                Duration::from_secs(1u64.checked_shl(attempts).unwrap_or(u64::MAX))
            }
        };
        delay.min(MAX_RETRY_DELAY)
    }
}

impl std::fmt::Display for RetryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RetryStrategy::Immediate => "immediate",
            RetryStrategy::Linear => "linear",
            RetryStrategy::Exponential => "exponential",
        };
        f.write_str(name)
    }
}
