//! The read boundary with the backing store.
//!
//! The store hands out loosely-shaped rows: ids may be strings or numbers,
//! any field may be absent, dates are free-form text. This module turns
//! them into the typed records of [`crate::model`]. A bad row is rejected on
//! its own and reported; the rest of the batch still loads.

#![allow(clippy::module_name_repetitions)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::aggregate::Snapshot;
use crate::date::normalize;
use crate::error::{EngineError, ErrorCode};
use crate::model::{
    CompletionEvent, DependencyEdge, Goal, GoalId, GoalStatus, Habit, HabitId, Task, TaskId,
    UserId,
};

// ---------------------------------------------------------------------------
// Raw rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawHabit {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub goal_id: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCompletionEvent {
    #[serde(default)]
    pub habit_id: Option<Value>,
    #[serde(default, alias = "date")]
    pub event_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTask {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub goal_id: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDependencyEdge {
    #[serde(default)]
    pub blocking_task_id: Option<Value>,
    #[serde(default)]
    pub dependent_task_id: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGoal {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Habit,
    CompletionEvent,
    Task,
    DependencyEdge,
    Goal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    InvalidDate { input: String },
    MissingField { field: String },
    InvalidGoalStatus { value: String },
}

impl RejectReason {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidDate { .. } => ErrorCode::InvalidDate,
            Self::MissingField { .. } => ErrorCode::MissingField,
            Self::InvalidGoalStatus { .. } => ErrorCode::InvalidGoalStatus,
        }
    }

    fn missing(field: &str) -> Self {
        Self::MissingField {
            field: field.to_string(),
        }
    }
}

/// A row that failed validation, by position in its batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub kind: RecordKind,
    pub index: usize,
    #[serde(flatten)]
    pub reason: RejectReason,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Ids arrive as strings or integers depending on the table.
fn id_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn validate_batch<R, T>(
    kind: RecordKind,
    rows: &[R],
    rejected: &mut Vec<RejectedRecord>,
    check: impl Fn(&R) -> Result<T, RejectReason>,
) -> Vec<T> {
    let mut accepted = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        match check(row) {
            Ok(record) => accepted.push(record),
            Err(reason) => {
                warn!(?kind, index, code = %reason.code(), ?reason, "rejected store record");
                rejected.push(RejectedRecord {
                    kind,
                    index,
                    reason,
                });
            }
        }
    }
    accepted
}

pub fn validate_habit(raw: &RawHabit) -> Result<Habit, RejectReason> {
    let id = id_of(raw.id.as_ref()).ok_or_else(|| RejectReason::missing("id"))?;
    Ok(Habit {
        id: HabitId::new(id),
        goal_id: id_of(raw.goal_id.as_ref()).map(GoalId::new),
    })
}

pub fn validate_event(raw: &RawCompletionEvent) -> Result<CompletionEvent, RejectReason> {
    let habit_id = id_of(raw.habit_id.as_ref()).ok_or_else(|| RejectReason::missing("habit_id"))?;
    let input = raw
        .event_date
        .as_deref()
        .ok_or_else(|| RejectReason::missing("event_date"))?;
    let date = normalize(input).map_err(|err| match err {
        EngineError::InvalidDate { input } => RejectReason::InvalidDate { input },
        other => RejectReason::InvalidDate {
            input: other.to_string(),
        },
    })?;
    Ok(CompletionEvent::new(HabitId::new(habit_id), date))
}

/// A missing `completed` flag means "not completed".
pub fn validate_task(raw: &RawTask) -> Result<Task, RejectReason> {
    let id = id_of(raw.id.as_ref()).ok_or_else(|| RejectReason::missing("id"))?;
    Ok(Task {
        id: TaskId::new(id),
        completed: raw.completed.unwrap_or(false),
        goal_id: id_of(raw.goal_id.as_ref()).map(GoalId::new),
    })
}

pub fn validate_edge(raw: &RawDependencyEdge) -> Result<DependencyEdge, RejectReason> {
    let blocking = id_of(raw.blocking_task_id.as_ref())
        .ok_or_else(|| RejectReason::missing("blocking_task_id"))?;
    let dependent = id_of(raw.dependent_task_id.as_ref())
        .ok_or_else(|| RejectReason::missing("dependent_task_id"))?;
    Ok(DependencyEdge::new(blocking, dependent))
}

/// A missing status means `pending`.
pub fn validate_goal(raw: &RawGoal) -> Result<Goal, RejectReason> {
    let id = id_of(raw.id.as_ref()).ok_or_else(|| RejectReason::missing("id"))?;
    let status = match raw.status.as_deref() {
        None => GoalStatus::default(),
        Some(value) => value
            .parse::<GoalStatus>()
            .map_err(|_| RejectReason::InvalidGoalStatus {
                value: value.to_string(),
            })?,
    };
    Ok(Goal {
        id: GoalId::new(id),
        status,
    })
}

// ---------------------------------------------------------------------------
// Snapshot export
// ---------------------------------------------------------------------------

/// One user's raw rows, as exported from the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub habits: Vec<RawHabit>,
    #[serde(default)]
    pub events: Vec<RawCompletionEvent>,
    #[serde(default)]
    pub tasks: Vec<RawTask>,
    #[serde(default)]
    pub edges: Vec<RawDependencyEdge>,
    #[serde(default)]
    pub goals: Vec<RawGoal>,
}

/// A validated snapshot together with the rows that were turned away.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedSnapshot {
    pub snapshot: Snapshot,
    pub rejected: Vec<RejectedRecord>,
}

impl SnapshotFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))
    }

    #[must_use]
    pub fn validate(&self) -> LoadedSnapshot {
        let mut rejected = Vec::new();
        let snapshot = Snapshot {
            habits: validate_batch(RecordKind::Habit, &self.habits, &mut rejected, validate_habit),
            events: validate_batch(
                RecordKind::CompletionEvent,
                &self.events,
                &mut rejected,
                validate_event,
            ),
            tasks: validate_batch(RecordKind::Task, &self.tasks, &mut rejected, validate_task),
            edges: validate_batch(
                RecordKind::DependencyEdge,
                &self.edges,
                &mut rejected,
                validate_edge,
            ),
            goals: validate_batch(RecordKind::Goal, &self.goals, &mut rejected, validate_goal),
        };
        debug!(rejected = rejected.len(), "snapshot validated");
        LoadedSnapshot { snapshot, rejected }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Read side of the backing store. Results are already access-controlled
/// for `user`.
pub trait Store {
    fn fetch_habits(&self, user: &UserId) -> Result<Vec<RawHabit>>;
    fn fetch_tasks(&self, user: &UserId) -> Result<Vec<RawTask>>;
    fn fetch_goals(&self, user: &UserId) -> Result<Vec<RawGoal>>;
    fn fetch_completion_events(
        &self,
        user: &UserId,
        habit: Option<&HabitId>,
    ) -> Result<Vec<RawCompletionEvent>>;
    fn fetch_dependency_edges(&self, user: &UserId) -> Result<Vec<RawDependencyEdge>>;
}

/// Fetch and validate everything the engine needs for one user.
pub fn load_snapshot(store: &impl Store, user: &UserId) -> Result<LoadedSnapshot> {
    let file = SnapshotFile {
        habits: store
            .fetch_habits(user)
            .with_context(|| format!("fetch habits for '{user}'"))?,
        events: store
            .fetch_completion_events(user, None)
            .with_context(|| format!("fetch completion events for '{user}'"))?,
        tasks: store
            .fetch_tasks(user)
            .with_context(|| format!("fetch tasks for '{user}'"))?,
        edges: store
            .fetch_dependency_edges(user)
            .with_context(|| format!("fetch dependency edges for '{user}'"))?,
        goals: store
            .fetch_goals(user)
            .with_context(|| format!("fetch goals for '{user}'"))?,
    };
    Ok(file.validate())
}

/// A [`Store`] backed by per-user snapshot exports held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    users: HashMap<UserId, SnapshotFile>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, user: UserId, file: SnapshotFile) {
        self.users.insert(user, file);
    }

    fn user(&self, user: &UserId) -> Option<&SnapshotFile> {
        self.users.get(user)
    }
}

impl Store for InMemoryStore {
    fn fetch_habits(&self, user: &UserId) -> Result<Vec<RawHabit>> {
        Ok(self.user(user).map(|f| f.habits.clone()).unwrap_or_default())
    }

    fn fetch_tasks(&self, user: &UserId) -> Result<Vec<RawTask>> {
        Ok(self.user(user).map(|f| f.tasks.clone()).unwrap_or_default())
    }

    fn fetch_goals(&self, user: &UserId) -> Result<Vec<RawGoal>> {
        Ok(self.user(user).map(|f| f.goals.clone()).unwrap_or_default())
    }

    fn fetch_completion_events(
        &self,
        user: &UserId,
        habit: Option<&HabitId>,
    ) -> Result<Vec<RawCompletionEvent>> {
        let Some(file) = self.user(user) else {
            return Ok(Vec::new());
        };
        Ok(file
            .events
            .iter()
            .filter(|event| {
                habit.is_none_or(|h| id_of(event.habit_id.as_ref()).as_deref() == Some(h.as_str()))
            })
            .cloned()
            .collect())
    }

    fn fetch_dependency_edges(&self, user: &UserId) -> Result<Vec<RawDependencyEdge>> {
        Ok(self.user(user).map(|f| f.edges.clone()).unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
