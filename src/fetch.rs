//! Resource fetcher capability.
//!
//! The actual bundle-loading mechanism lives upstream; this core only needs
//! a way to turn a resource identifier into payload bytes. The `ResourceFetcher`
//! trait is that seam, injected into the preloader and connectivity handler
//! at construction.
//!
//! # Dyn Compatibility
//!
//! Async methods use `Pin<Box<dyn Future>>` so the trait works through
//! `Arc<dyn ResourceFetcher>`, allowing the host to supply any transport.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use thiserror::Error;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error returned by a fetcher.
///
/// Transport details are opaque to this core; the message is carried through
/// for logging and surfaced inside [`LoadError::Fetch`](crate::error::LoadError).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct FetchError {
    /// Human-readable failure description from the transport.
    pub message: String,
}

impl FetchError {
    /// Create a fetch error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Asynchronous resource fetcher supplied by the upstream loader.
///
/// Implementations may fail or hang; timeouts are enforced by the callers
/// (the fetch is raced against a timer and abandoned on expiry, never
/// forcibly interrupted).
pub trait ResourceFetcher: Send + Sync {
    /// Fetch the payload for a resource identifier.
    fn fetch(&self, resource_id: &str) -> BoxFuture<'_, Result<Bytes, FetchError>>;
}

/// Map-backed fetcher for tests and simple hosts.
///
/// Serves payloads registered via [`insert`](StaticFetcher::insert), with an
/// optional artificial latency. Unknown ids fail.
#[derive(Default)]
pub struct StaticFetcher {
    resources: Mutex<HashMap<String, Bytes>>,
    latency: Option<Duration>,
}

impl StaticFetcher {
    /// Create an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fetcher that delays every response by `latency`.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            resources: Mutex::new(HashMap::new()),
            latency: Some(latency),
        }
    }

    /// Register a payload for a resource id.
    pub fn insert(&self, resource_id: impl Into<String>, payload: impl Into<Bytes>) {
        self.resources.lock().insert(resource_id.into(), payload.into());
    }

    /// Remove a payload, making subsequent fetches fail.
    pub fn remove(&self, resource_id: &str) {
        self.resources.lock().remove(resource_id);
    }
}

impl ResourceFetcher for StaticFetcher {
    fn fetch(&self, resource_id: &str) -> BoxFuture<'_, Result<Bytes, FetchError>> {
        let found = self.resources.lock().get(resource_id).cloned();
        let latency = self.latency;
        let id = resource_id.to_string();
        Box::pin(async move {
            if let Some(delay) = latency {
                tokio::time::sleep(delay).await;
            }
            found.ok_or_else(|| FetchError::new(format!("no such resource: {}", id)))
        })
    }
}

/// Fetcher that always fails.
///
/// Useful for exercising fallback and offline paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingFetcher;

impl ResourceFetcher for FailingFetcher {
    fn fetch(&self, resource_id: &str) -> BoxFuture<'_, Result<Bytes, FetchError>> {
        let id = resource_id.to_string();
        Box::pin(async move { Err(FetchError::new(format!("fetch failed: {}", id))) })
    }
}
