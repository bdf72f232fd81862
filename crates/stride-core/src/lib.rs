//! stride-core library.
//!
//! Derives habit streaks, task blocking state and goal progress from a
//! user's raw records. Nothing here owns storage: callers hand in a
//! [`aggregate::Snapshot`] (or a [`store::Store`] to load one from) and get
//! derived values back.
//!
//! # Conventions
//!
//! - **Errors**: Domain failures are [`error::EngineError`]; I/O and config
//!   loading use `anyhow::Result` with context.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).
//! - **Dates**: Every day boundary is a UTC [`date::CalendarDate`].

pub mod aggregate;
pub mod config;
pub mod date;
pub mod error;
pub mod graph;
pub mod model;
pub mod progress;
pub mod store;
pub mod streak;

pub use aggregate::{Snapshot, SnapshotSummary, TaskBoard, summarize_snapshot};
pub use date::CalendarDate;
pub use error::{EngineError, ErrorCode};
