//! Adaptive network-aware resource loading.
//!
//! This library watches network telemetry and adapts how an application
//! loads remote resources: how many loads to run in parallel, what
//! timeouts to use, whether to preload speculatively, and how to keep
//! serving content across flaky or absent connections.
//!
//! # Components
//!
//! | Component | Role |
//! |-----------|------|
//! | [`QualityMonitor`](monitor::QualityMonitor) | Turns telemetry readings into a quality score, stability estimate and connection events |
//! | [`BandwidthPreloader`](preload::BandwidthPreloader) | Drains a scored preload queue through a bandwidth budget |
//! | [`ConnectivityHandler`](connectivity::ConnectivityHandler) | Offline cache, cache/network resolution and reconnection backoff |
//! | [`AdaptationCoordinator`](coordinator::AdaptationCoordinator) | Wires the above together and derives per-load recommendations |
//!
//! # Module Structure
//!
//! ```text
//! src/
//! ├── types.rs        # Priority, ReasonTag, LoadContext
//! ├── telemetry.rs    # TelemetrySource capability
//! ├── fetch.rs        # ResourceFetcher capability
//! ├── events.rs       # listener registry with disposer handles
//! ├── error.rs        # LoadError taxonomy
//! ├── config.rs       # LoaderConfig and defaults
//! ├── monitor/        # quality monitoring
//! ├── preload/        # bandwidth-aware preloading
//! ├── connectivity/   # offline cache + reconnection
//! └── coordinator/    # cross-component adaptation
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use adaptive_loader::{
//!     AdaptationCoordinator, LoadContext, LoaderConfig, Priority, ReasonTag,
//! };
//!
//! let coordinator = AdaptationCoordinator::new(telemetry, fetcher, LoaderConfig::default());
//!
//! // Hint that a resource will probably be needed soon.
//! coordinator.request_preload("assets/map-tiles", Priority::Normal, ReasonTag::Viewport, 0.8, 250_000);
//!
//! // Load with conditions-aware timeout and cache policy.
//! let bytes = coordinator
//!     .load_resource("assets/map-tiles", Priority::High, &LoadContext::none())
//!     .await?;
//! ```

pub mod config;
pub mod connectivity;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod fetch;
pub mod monitor;
pub mod preload;
pub mod telemetry;
pub mod types;

pub use config::LoaderConfig;
pub use connectivity::ConnectivityHandler;
pub use coordinator::{AdaptationCoordinator, LoaderMetrics, LoadingRecommendation};
pub use error::LoadError;
pub use fetch::{FetchError, ResourceFetcher};
pub use monitor::{QualityMetrics, QualityMonitor};
pub use preload::{BandwidthPreloader, PreloadRequest};
pub use telemetry::{NetworkReading, TelemetrySource};
pub use types::{LoadContext, Priority, ReasonTag};
