//! Load error taxonomy.
//!
//! Only the connectivity handler propagates errors to callers; preload
//! failures are absorbed and surfaced via listener callbacks. The distinct
//! `OfflineNoCache` variant lets callers tell "no content available" apart
//! from a network error.

use thiserror::Error;

use crate::fetch::FetchError;

/// Errors surfaced by `load_resource`.
///
/// Every variant carries the resource id so callers can correlate failures
/// with their requests. No variant is fatal to the process.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Offline and the resource is not in the cache.
    #[error("resource '{resource_id}' is not available offline")]
    OfflineNoCache {
        /// The requested resource.
        resource_id: String,
    },

    /// The fetch did not complete within the timeout.
    ///
    /// The underlying fetch is abandoned, not interrupted; its eventual
    /// result is discarded.
    #[error("timed out loading '{resource_id}' after {timeout_ms}ms")]
    Timeout {
        /// The requested resource.
        resource_id: String,
        /// The timeout that expired.
        timeout_ms: u64,
    },

    /// The network fetch failed and no cached fallback was available.
    #[error("failed to fetch '{resource_id}': {source}")]
    Fetch {
        /// The requested resource.
        resource_id: String,
        /// Transport-level failure.
        #[source]
        source: FetchError,
    },

    /// The component has been destroyed.
    #[error("loader is shutting down")]
    ShuttingDown,
}

impl LoadError {
    /// The resource id this error relates to, if any.
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            LoadError::OfflineNoCache { resource_id }
            | LoadError::Timeout { resource_id, .. }
            | LoadError::Fetch { resource_id, .. } => Some(resource_id),
            LoadError::ShuttingDown => None,
        }
    }

    /// True for the fail-fast "no content available offline" case.
    pub fn is_offline_no_cache(&self) -> bool {
        matches!(self, LoadError::OfflineNoCache { .. })
    }
}
