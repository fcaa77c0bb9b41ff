//! Request coordinator for the dashboard's market, portfolio and AI data.
//!
//! Scheduled ticks and manual refreshes become [`queue::QueuedRequest`]s,
//! which are deduplicated, ordered by priority and dispatched under a fixed
//! concurrency cap. Successful results land in a TTL cache that UI
//! consumers read through the [`Coordinator`] facade.

pub mod cache;
pub mod category;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fetcher;
pub mod limiter;
pub mod queue;
pub mod rate_gate;
pub mod scheduler;
pub mod state;
pub mod status;

pub use category::Category;
pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, RefreshHandle};
pub use error::{CoordinatorError, FetchError};
pub use fetcher::{CategoryData, Fetchers};
pub use status::CoordinatorStatus;
