//! Shared plumbing for the dashboard workspace: tracing bootstrap,
//! correlation ids and span helpers.

pub mod logger;

pub use logger::{TraceId, init_logger, warn_if_slow};
