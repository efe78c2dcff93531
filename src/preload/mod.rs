//! Bandwidth-aware speculative preloading.
//!
//! # Module Structure
//!
//! ```text
//! preload/
//! ├── request.rs    # PreloadRequest lifecycle
//! ├── queue.rs      # composite-score queue
//! ├── budget.rs     # sliding-window bandwidth budget
//! └── preloader.rs  # BandwidthPreloader component
//! ```

mod budget;
mod preloader;
mod queue;
mod request;

pub use budget::{BandwidthBudget, BudgetSnapshot};
pub use preloader::{
    BandwidthPreloader, BandwidthStats, DispatchRecord, PreloadSink, PreloadStrategy,
    PreloadStrategyUpdate, QueueStatus,
};
pub use queue::{request_score, PreloadQueue, URGENCY_HORIZON, URGENCY_MAX};
pub use request::PreloadRequest;
