//! Resilient loading across intermittent connections.
//!
//! # Module Structure
//!
//! ```text
//! connectivity/
//! ├── backoff.rs    # reconnection delay schedules
//! ├── cache.rs      # size/age-bounded offline cache
//! ├── state.rs      # snapshot types
//! └── handler.rs    # ConnectivityHandler component
//! ```

mod backoff;
mod cache;
mod handler;
mod state;

pub use backoff::{RetryStrategy, MAX_RETRY_DELAY};
pub use cache::{CacheStats, CachedResource, ResourceCache};
pub use handler::{ConnectivityHandler, ConnectivityStrategyUpdate};
pub use state::{ConnectivityState, ReconnectionPhase};
