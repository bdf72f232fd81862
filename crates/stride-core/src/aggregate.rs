//! Per-user summaries over a full snapshot, and the incremental contracts
//! used after a single mutation.
//!
//! # Full recompute
//!
//! [`summarize_habits`], [`summarize_tasks`] and [`summarize_snapshot`] are
//! pure functions of the snapshot. They are the reference result: the
//! incremental paths below must always agree with them.
//!
//! # Incremental recompute
//!
//! - [`apply_event_mutation`] recomputes one habit's [`StreakSummary`] after a
//!   completion is added or removed, without touching other habits.
//! - [`TaskBoard::apply_task_completion`] flips one task's flag and recomputes
//!   [`BlockStatus`] only for that task's direct dependents.

#![allow(
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
)]

use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::date::CalendarDate;
use crate::error::{EngineError, ErrorCode};
use crate::graph::{
    CompletionLookup, CycleWarning, CyclePolicy, DanglingEdge, DependencyGraph, find_all_cycles,
};
use crate::model::{
    BlockStatus, CompletionEvent, DependencyEdge, Goal, GoalId, Habit, HabitId, StreakSummary, Task,
    TaskId,
};
use crate::progress::{AnalyticsSummary, GoalProgress, analytics_summary, summarize_goals};
use crate::streak::CompletionHistory;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything the engine needs for one user, as fetched from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub events: Vec<CompletionEvent>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub edges: Vec<DependencyEdge>,
    #[serde(default)]
    pub goals: Vec<Goal>,
}

/// A non-fatal problem found while summarizing a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotWarning {
    /// An edge references a task that no longer exists.
    DanglingEdge(DanglingEdge),
    /// The stored edges already contain a cycle.
    Cycle(CycleWarning),
}

impl SnapshotWarning {
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::DanglingEdge(_) => ErrorCode::DanglingEdgeReference,
            Self::Cycle(_) => ErrorCode::CycleDetected,
        }
    }
}

/// Serialize warnings with their stable code alongside the tagged payload.
fn serialize_warnings<S: Serializer>(
    warnings: &[SnapshotWarning],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct Coded<'a> {
        code: &'static str,
        #[serde(flatten)]
        warning: &'a SnapshotWarning,
    }

    serializer.collect_seq(warnings.iter().map(|warning| Coded {
        code: warning.code().code(),
        warning,
    }))
}

/// All derived facts for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub as_of: CalendarDate,
    pub habits: BTreeMap<HabitId, StreakSummary>,
    pub tasks: BTreeMap<TaskId, BlockStatus>,
    pub goals: BTreeMap<GoalId, GoalProgress>,
    pub analytics: AnalyticsSummary,
    /// Incomplete tasks with no active blockers.
    pub ready_tasks: Vec<TaskId>,
    #[serde(serialize_with = "serialize_warnings")]
    pub warnings: Vec<SnapshotWarning>,
}

// ---------------------------------------------------------------------------
// Habits
// ---------------------------------------------------------------------------

pub fn group_events_by_habit(events: &[CompletionEvent]) -> HashMap<HabitId, Vec<CompletionEvent>> {
    let mut grouped: HashMap<HabitId, Vec<CompletionEvent>> = HashMap::new();
    for event in events {
        grouped
            .entry(event.habit_id.clone())
            .or_default()
            .push(event.clone());
    }
    grouped
}

/// Streak summary for every habit. Habits without events get all zeros.
pub fn summarize_habits<S: BuildHasher>(
    habits: &[Habit],
    events_by_habit: &HashMap<HabitId, Vec<CompletionEvent>, S>,
    as_of: CalendarDate,
) -> BTreeMap<HabitId, StreakSummary> {
    habits
        .iter()
        .map(|habit| {
            let history = events_by_habit
                .get(&habit.id)
                .map(|events| CompletionHistory::from_events(events))
                .unwrap_or_default();
            (habit.id.clone(), history.summarize(as_of))
        })
        .collect()
}

/// A single change to one habit's completion events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "date", rename_all = "lowercase")]
pub enum EventMutation {
    /// "Mark done" on a day.
    Add(CalendarDate),
    /// Delete one event on a day. No-op when there is none.
    Remove(CalendarDate),
}

/// Recompute one habit's summary after a single event mutation.
///
/// The result always equals summarizing the mutated event list from
/// scratch. Removing one of several same-day events leaves the day
/// completed, just as deleting one duplicate row would.
///
/// # Errors
///
/// [`EngineError::HabitMismatch`] if `prior_events` holds another habit's
/// event.
pub fn apply_event_mutation(
    habit_id: &HabitId,
    prior_events: &[CompletionEvent],
    mutation: EventMutation,
    as_of: CalendarDate,
) -> Result<StreakSummary, EngineError> {
    let mut per_day: BTreeMap<CalendarDate, usize> = BTreeMap::new();
    for event in prior_events {
        if &event.habit_id != habit_id {
            return Err(EngineError::HabitMismatch {
                expected: habit_id.clone(),
                found: event.habit_id.clone(),
            });
        }
        *per_day.entry(event.date).or_default() += 1;
    }

    match mutation {
        EventMutation::Add(date) => *per_day.entry(date).or_default() += 1,
        EventMutation::Remove(date) => {
            if let Some(count) = per_day.get_mut(&date) {
                *count -= 1;
                if *count == 0 {
                    per_day.remove(&date);
                }
            }
        }
    }

    let summary = per_day
        .into_keys()
        .collect::<CompletionHistory>()
        .summarize(as_of);
    debug!(habit = %habit_id, ?mutation, ?summary, "habit summary recomputed");
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Blocked status of every task.
pub fn summarize_tasks(tasks: &[Task], edges: &[DependencyEdge]) -> BTreeMap<TaskId, BlockStatus> {
    TaskBoard::new(tasks, edges, CyclePolicy::default()).statuses()
}

/// The outcome of flipping one task's completion flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCompletionOutcome {
    /// Dependents whose status changed, with their new status.
    pub updated_block_statuses: BTreeMap<TaskId, BlockStatus>,
    /// Dependents that went from blocked to unblocked.
    pub unblocked: Vec<TaskId>,
}

/// The outcome of adding a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyChange {
    /// New status of the dependent task.
    pub status: BlockStatus,
    /// Set when the edge closed a cycle under [`CyclePolicy::Warn`].
    pub warning: Option<CycleWarning>,
}

/// Task completion flags plus the dependency graph of one user.
///
/// Owned by the caller and threaded through mutations; nothing here is
/// shared or global.
#[derive(Debug, Clone, Default)]
pub struct TaskBoard {
    completed: HashMap<TaskId, bool>,
    graph: DependencyGraph,
}

impl CompletionLookup for TaskBoard {
    fn is_task_completed(&self, task: &TaskId) -> Option<bool> {
        self.completed.get(task).copied()
    }
}

impl TaskBoard {
    pub fn new(tasks: &[Task], edges: &[DependencyEdge], policy: CyclePolicy) -> Self {
        Self {
            completed: tasks.iter().map(|t| (t.id.clone(), t.completed)).collect(),
            graph: DependencyGraph::from_edges(edges, policy),
        }
    }

    pub const fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn contains(&self, task: &TaskId) -> bool {
        self.completed.contains_key(task)
    }

    /// Current status of one task.
    ///
    /// # Errors
    ///
    /// [`EngineError::TaskNotFound`] for a task outside the snapshot.
    pub fn status(&self, task: &TaskId) -> Result<BlockStatus, EngineError> {
        self.require(task)?;
        Ok(self.graph.status(task, &self.completed))
    }

    /// Status of every task in the snapshot.
    pub fn statuses(&self) -> BTreeMap<TaskId, BlockStatus> {
        self.completed
            .keys()
            .map(|task| (task.clone(), self.graph.status(task, &self.completed)))
            .collect()
    }

    /// Incomplete tasks with no active blockers, sorted by id.
    pub fn ready_tasks(&self) -> Vec<TaskId> {
        let mut ready: Vec<TaskId> = self
            .completed
            .iter()
            .filter(|&(task, &done)| !done && !self.graph.is_blocked(task, &self.completed))
            .map(|(task, _)| task.clone())
            .collect();
        ready.sort();
        ready
    }

    pub fn dangling_edges(&self) -> Vec<DanglingEdge> {
        self.graph.dangling_edges(&self.completed)
    }

    /// Validate and insert "`blocking` blocks `dependent`".
    ///
    /// # Errors
    ///
    /// [`EngineError::TaskNotFound`] if either task is unknown, plus every
    /// error of [`DependencyGraph::add_edge`].
    pub fn add_dependency(
        &mut self,
        blocking: &TaskId,
        dependent: &TaskId,
    ) -> Result<DependencyChange, EngineError> {
        self.require(blocking)?;
        self.require(dependent)?;
        let warning = self.graph.add_edge(blocking, dependent)?;
        Ok(DependencyChange {
            status: self.graph.status(dependent, &self.completed),
            warning,
        })
    }

    /// Remove an edge (idempotent) and return the dependent's new status.
    pub fn remove_dependency(&mut self, blocking: &TaskId, dependent: &TaskId) -> BlockStatus {
        self.graph.remove_edge(blocking, dependent);
        self.graph.status(dependent, &self.completed)
    }

    /// Set one task's completion flag.
    ///
    /// Only the task's direct dependents are recomputed, and only those whose
    /// status actually changed are returned.
    ///
    /// # Errors
    ///
    /// - [`EngineError::TaskNotFound`] for an unknown task.
    /// - [`EngineError::TaskBlocked`] when completing a task that still has
    ///   incomplete blockers. State is left unchanged.
    pub fn apply_task_completion(
        &mut self,
        task: &TaskId,
        completed: bool,
    ) -> Result<TaskCompletionOutcome, EngineError> {
        let current = self.require(task)?;
        if completed {
            self.graph.ensure_completable(task, &self.completed)?;
        }
        if current == completed {
            return Ok(TaskCompletionOutcome::default());
        }

        let dependents: Vec<TaskId> = self
            .graph
            .dependents_of(task)
            .into_iter()
            .filter(|dependent| self.completed.contains_key(dependent))
            .collect();

        let before: Vec<(TaskId, BlockStatus)> = dependents
            .iter()
            .map(|d| (d.clone(), self.graph.status(d, &self.completed)))
            .collect();
        let predicted: Vec<bool> = before
            .iter()
            .map(|(d, _)| completed && self.graph.would_unblock(d, task, &self.completed))
            .collect();

        self.completed.insert(task.clone(), completed);

        let mut outcome = TaskCompletionOutcome::default();
        for ((dependent, old), will_unblock) in before.into_iter().zip(predicted) {
            let new = self.graph.status(&dependent, &self.completed);
            if old.is_blocked && !new.is_blocked {
                debug_assert!(will_unblock, "unblock of '{dependent}' not predicted");
                info!(task = %dependent, by = %task, "task unblocked");
                outcome.unblocked.push(dependent.clone());
            }
            if new != old {
                outcome.updated_block_statuses.insert(dependent, new);
            }
        }

        debug!(
            %task,
            completed,
            changed = outcome.updated_block_statuses.len(),
            "task completion applied"
        );
        Ok(outcome)
    }

    fn require(&self, task: &TaskId) -> Result<bool, EngineError> {
        self.completed
            .get(task)
            .copied()
            .ok_or_else(|| EngineError::TaskNotFound(task.clone()))
    }
}

// ---------------------------------------------------------------------------
// Whole snapshot
// ---------------------------------------------------------------------------

/// Derive every summary for one snapshot.
pub fn summarize_snapshot(
    snapshot: &Snapshot,
    as_of: CalendarDate,
    config: &EngineConfig,
) -> SnapshotSummary {
    let events_by_habit = group_events_by_habit(&snapshot.events);
    let habits = summarize_habits(&snapshot.habits, &events_by_habit, as_of);

    let board = TaskBoard::new(&snapshot.tasks, &snapshot.edges, config.cycle_policy);
    let tasks = board.statuses();

    let mut warnings: Vec<SnapshotWarning> = Vec::new();
    for dangling in board.dangling_edges() {
        warn!(
            code = ErrorCode::DanglingEdgeReference.code(),
            blocking = %dangling.edge.blocking_task_id,
            dependent = %dangling.edge.dependent_task_id,
            missing = ?dangling.missing,
            "dangling dependency edge"
        );
        warnings.push(SnapshotWarning::DanglingEdge(dangling));
    }
    for cycle in find_all_cycles(board.graph()) {
        warn!("{cycle}");
        warnings.push(SnapshotWarning::Cycle(cycle));
    }

    let goals = summarize_goals(&snapshot.goals, &snapshot.tasks);
    let analytics = analytics_summary(
        &snapshot.goals,
        &snapshot.tasks,
        &snapshot.habits,
        &events_by_habit,
        as_of,
    );

    debug!(
        habits = habits.len(),
        tasks = tasks.len(),
        warnings = warnings.len(),
        "snapshot summarized"
    );

    SnapshotSummary {
        as_of,
        habits,
        tasks,
        goals,
        analytics,
        ready_tasks: board.ready_tasks(),
        warnings,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
