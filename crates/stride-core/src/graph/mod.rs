//! Task dependency graph and cycle handling.
//!
//! ## Submodules
//!
//! - [`dependency`] — the per-user "blocked-by" edge set and the derived
//!   blocked/unblocked status of each task.
//! - [`cycles`] — reachability checks run before an edge is inserted, plus
//!   whole-graph cycle diagnostics for edge sets loaded from the store.

pub mod cycles;
pub mod dependency;

pub use cycles::{CycleWarning, detect_cycle_on_add, find_all_cycles, has_cycles};
pub use dependency::{
    CompletionLookup, CyclePolicy, DanglingEdge, DanglingEnd, DependencyGraph,
};
