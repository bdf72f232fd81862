//! Blocked-by dependency graph over a user's tasks.
//!
//! # Overview
//!
//! A [`DependencyEdge`] says "the dependent task cannot be completed until the
//! blocking task is completed". The graph stores only the edges; completion
//! flags stay with the caller and are read through [`CompletionLookup`].
//!
//! # Scheduling semantics
//!
//! A task is **blocked** while at least one of its blockers exists and is
//! incomplete. A task with no incoming edges is never blocked. An edge whose
//! blocking task is unknown to the lookup is **dangling**: it is ignored for
//! blocking purposes and reported by [`DependencyGraph::dangling_edges`] so the
//! caller can clean it up.
//!
//! # Insertion
//!
//! [`DependencyGraph::add_edge`] rejects self-dependencies outright and runs a
//! reachability search before inserting. Under [`CyclePolicy::Reject`] a
//! cycle-closing edge fails with [`EngineError::CycleDetected`] and the graph
//! is left untouched. Under [`CyclePolicy::Warn`] the edge is inserted and
//! a [`CycleWarning`] is returned instead.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::collections::HashMap;
//! use stride_core::graph::{CyclePolicy, DependencyGraph};
//! use stride_core::model::TaskId;
//!
//! let mut graph = DependencyGraph::new(CyclePolicy::Reject);
//! graph.add_edge(&TaskId::from("a"), &TaskId::from("c"))?;
//!
//! let completed: HashMap<TaskId, bool> = /* ... */;
//! if graph.is_blocked(&TaskId::from("c"), &completed) {
//!     println!("c waits on {:?}", graph.active_blockers(&TaskId::from("c"), &completed));
//! }
//! ```

#![allow(
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
)]

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::BuildHasher;
use std::str::FromStr;

use tracing::{debug, warn};

use super::cycles::{self, CycleWarning};
use crate::error::EngineError;
use crate::model::{BlockStatus, DependencyEdge, TaskId};

// ---------------------------------------------------------------------------
// CompletionLookup
// ---------------------------------------------------------------------------

/// Read view of task completion flags owned outside the graph.
pub trait CompletionLookup {
    /// `Some(flag)` for a known task, `None` if the task does not exist.
    fn is_task_completed(&self, task: &TaskId) -> Option<bool>;
}

impl<S: BuildHasher> CompletionLookup for HashMap<TaskId, bool, S> {
    fn is_task_completed(&self, task: &TaskId) -> Option<bool> {
        self.get(task).copied()
    }
}

impl CompletionLookup for BTreeMap<TaskId, bool> {
    fn is_task_completed(&self, task: &TaskId) -> Option<bool> {
        self.get(task).copied()
    }
}

// ---------------------------------------------------------------------------
// CyclePolicy
// ---------------------------------------------------------------------------

/// What [`DependencyGraph::add_edge`] does with an edge that closes a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    /// Refuse the edge.
    #[default]
    Reject,
    /// Insert the edge and hand back a warning.
    Warn,
}

impl FromStr for CyclePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "warn" => Ok(Self::Warn),
            other => Err(format!(
                "unknown cycle policy '{other}' (expected 'reject' or 'warn')"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Dangling edges
// ---------------------------------------------------------------------------

/// Which end of a dangling edge is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DanglingEnd {
    Blocking,
    Dependent,
}

/// An edge that references a task the snapshot does not contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingEdge {
    pub edge: DependencyEdge,
    pub missing: DanglingEnd,
}

// ---------------------------------------------------------------------------
// DependencyGraph
// ---------------------------------------------------------------------------

/// The blocked-by edge set of one user.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// dependent → tasks that block it.
    blockers: HashMap<TaskId, BTreeSet<TaskId>>,
    /// blocking task → tasks it blocks.
    dependents: HashMap<TaskId, BTreeSet<TaskId>>,
    policy: CyclePolicy,
}

impl DependencyGraph {
    pub fn new(policy: CyclePolicy) -> Self {
        Self {
            blockers: HashMap::new(),
            dependents: HashMap::new(),
            policy,
        }
    }

    /// Bulk-load edges read from the store.
    ///
    /// Loading is tolerant of data written before cycle rejection existed:
    /// self-dependency edges are dropped (a task blocking itself could never
    /// be completed) and existing cycles are kept as-is. Use
    /// [`cycles::find_all_cycles`] to report them.
    ///
    /// # Complexity
    ///
    /// O(E log E) where E is the number of edges.
    pub fn from_edges<'a>(
        edges: impl IntoIterator<Item = &'a DependencyEdge>,
        policy: CyclePolicy,
    ) -> Self {
        let mut graph = Self::new(policy);
        for edge in edges {
            if edge.blocking_task_id == edge.dependent_task_id {
                warn!(task = %edge.blocking_task_id, "dropping self-dependency edge");
                continue;
            }
            graph.insert(&edge.blocking_task_id, &edge.dependent_task_id);
        }
        graph
    }

    pub const fn policy(&self) -> CyclePolicy {
        self.policy
    }

    /// Add the edge "`blocking` blocks `dependent`".
    ///
    /// Re-adding an existing edge is a no-op. Returns a [`CycleWarning`] only
    /// when the edge closed a cycle and the policy is [`CyclePolicy::Warn`].
    ///
    /// # Errors
    ///
    /// - [`EngineError::SelfDependency`] if both ids are equal.
    /// - [`EngineError::CycleDetected`] if `dependent` already transitively
    ///   blocks `blocking` and the policy is [`CyclePolicy::Reject`]. The graph
    ///   is unchanged.
    pub fn add_edge(
        &mut self,
        blocking: &TaskId,
        dependent: &TaskId,
    ) -> Result<Option<CycleWarning>, EngineError> {
        if blocking == dependent {
            return Err(EngineError::SelfDependency {
                task: blocking.clone(),
            });
        }
        if self.contains_edge(blocking, dependent) {
            return Ok(None);
        }

        let warning = cycles::detect_cycle_on_add(self, blocking, dependent);
        if let Some(warning) = &warning {
            warn!(%blocking, %dependent, "{warning}");
            if self.policy == CyclePolicy::Reject {
                return Err(EngineError::CycleDetected {
                    path: warning.cycle_path.clone(),
                });
            }
        }

        self.insert(blocking, dependent);
        debug!(%blocking, %dependent, "dependency added");
        Ok(warning)
    }

    /// Remove the edge if present. Returns whether anything was removed.
    pub fn remove_edge(&mut self, blocking: &TaskId, dependent: &TaskId) -> bool {
        let removed = remove_from(&mut self.blockers, dependent, blocking);
        if removed {
            remove_from(&mut self.dependents, blocking, dependent);
            debug!(%blocking, %dependent, "dependency removed");
        }
        removed
    }

    pub fn contains_edge(&self, blocking: &TaskId, dependent: &TaskId) -> bool {
        self.blockers
            .get(dependent)
            .is_some_and(|set| set.contains(blocking))
    }

    /// Every task with an edge into `task`, active or not, sorted by id.
    pub fn blockers_of(&self, task: &TaskId) -> Vec<TaskId> {
        self.blocker_ids(task).cloned().collect()
    }

    /// Every task that `task` blocks, sorted by id.
    pub fn dependents_of(&self, task: &TaskId) -> Vec<TaskId> {
        self.dependent_ids(task).cloned().collect()
    }

    /// Blockers that exist and are not yet completed, sorted by id.
    pub fn active_blockers(&self, task: &TaskId, lookup: &impl CompletionLookup) -> Vec<TaskId> {
        self.blocker_ids(task)
            .filter(|blocker| lookup.is_task_completed(blocker) == Some(false))
            .cloned()
            .collect()
    }

    /// `true` iff at least one existing blocker is incomplete.
    pub fn is_blocked(&self, task: &TaskId, lookup: &impl CompletionLookup) -> bool {
        self.blocker_ids(task)
            .any(|blocker| lookup.is_task_completed(blocker) == Some(false))
    }

    /// Whether `task` is currently blocked solely by `just_completed`.
    ///
    /// Ask before the flip: once `just_completed` is complete the answer is
    /// `false`.
    pub fn would_unblock(
        &self,
        task: &TaskId,
        just_completed: &TaskId,
        lookup: &impl CompletionLookup,
    ) -> bool {
        let Some(set) = self.blockers.get(task) else {
            return false;
        };
        set.contains(just_completed)
            && lookup.is_task_completed(just_completed) == Some(false)
            && set
                .iter()
                .filter(|blocker| *blocker != just_completed)
                .all(|blocker| lookup.is_task_completed(blocker) != Some(false))
    }

    pub fn status(&self, task: &TaskId, lookup: &impl CompletionLookup) -> BlockStatus {
        BlockStatus::from_active(self.active_blockers(task, lookup))
    }

    /// Check that `task` may be marked complete.
    ///
    /// # Errors
    ///
    /// [`EngineError::TaskBlocked`] naming the outstanding blockers.
    pub fn ensure_completable(
        &self,
        task: &TaskId,
        lookup: &impl CompletionLookup,
    ) -> Result<(), EngineError> {
        let blockers = self.active_blockers(task, lookup);
        if blockers.is_empty() {
            Ok(())
        } else {
            Err(EngineError::TaskBlocked {
                task: task.clone(),
                blockers,
            })
        }
    }

    /// Edges whose blocking or dependent task is unknown to `lookup`.
    pub fn dangling_edges(&self, lookup: &impl CompletionLookup) -> Vec<DanglingEdge> {
        self.edges()
            .into_iter()
            .filter_map(|edge| {
                let missing = if lookup.is_task_completed(&edge.blocking_task_id).is_none() {
                    DanglingEnd::Blocking
                } else if lookup.is_task_completed(&edge.dependent_task_id).is_none() {
                    DanglingEnd::Dependent
                } else {
                    return None;
                };
                Some(DanglingEdge { edge, missing })
            })
            .collect()
    }

    /// All edges, sorted by (blocking, dependent).
    pub fn edges(&self) -> Vec<DependencyEdge> {
        let mut edges: Vec<DependencyEdge> = self
            .dependents
            .iter()
            .flat_map(|(blocking, set)| {
                set.iter()
                    .map(move |dependent| DependencyEdge::new(blocking.clone(), dependent.clone()))
            })
            .collect();
        edges.sort();
        edges
    }

    pub fn edge_count(&self) -> usize {
        self.blockers.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blockers.is_empty()
    }

    /// Every task that appears on either end of an edge, sorted by id.
    pub fn task_ids(&self) -> Vec<&TaskId> {
        let ids: BTreeSet<&TaskId> = self
            .blockers
            .keys()
            .chain(self.dependents.keys())
            .collect();
        ids.into_iter().collect()
    }

    pub(crate) fn blocker_ids<'a>(
        &'a self,
        task: &TaskId,
    ) -> impl Iterator<Item = &'a TaskId> + use<'a> {
        self.blockers.get(task).into_iter().flatten()
    }

    pub(crate) fn dependent_ids<'a>(
        &'a self,
        task: &TaskId,
    ) -> impl Iterator<Item = &'a TaskId> + use<'a> {
        self.dependents.get(task).into_iter().flatten()
    }

    fn insert(&mut self, blocking: &TaskId, dependent: &TaskId) {
        self.blockers
            .entry(dependent.clone())
            .or_default()
            .insert(blocking.clone());
        self.dependents
            .entry(blocking.clone())
            .or_default()
            .insert(dependent.clone());
    }
}

fn remove_from(map: &mut HashMap<TaskId, BTreeSet<TaskId>>, key: &TaskId, value: &TaskId) -> bool {
    let Some(set) = map.get_mut(key) else {
        return false;
    };
    let removed = set.remove(value);
    if set.is_empty() {
        map.remove(key);
    }
    removed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
