//! Validated records the engine computes over.
//!
//! These are the typed counterparts of the loosely-shaped rows the backing
//! store hands out; see [`crate::store`] for the conversion.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::date::CalendarDate;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a habit.
    HabitId
);
string_id!(
    /// Identifier of a task.
    TaskId
);
string_id!(
    /// Identifier of a goal.
    GoalId
);
string_id!(
    /// Identifier of the user that owns a snapshot.
    UserId
);

/// A habit. Only identity and the owning goal matter to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<GoalId>,
}

/// "This habit was marked done on this day."
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub habit_id: HabitId,
    pub date: CalendarDate,
}

impl CompletionEvent {
    pub fn new(habit_id: impl Into<HabitId>, date: CalendarDate) -> Self {
        Self {
            habit_id: habit_id.into(),
            date,
        }
    }
}

/// A task with its completion flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<GoalId>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, completed: bool) -> Self {
        Self {
            id: id.into(),
            completed,
            goal_id: None,
        }
    }

    #[must_use]
    pub fn with_goal(mut self, goal_id: impl Into<GoalId>) -> Self {
        self.goal_id = Some(goal_id.into());
        self
    }
}

/// `dependent_task_id` cannot be completed until `blocking_task_id` is.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub blocking_task_id: TaskId,
    pub dependent_task_id: TaskId,
}

impl DependencyEdge {
    pub fn new(blocking: impl Into<TaskId>, dependent: impl Into<TaskId>) -> Self {
        Self {
            blocking_task_id: blocking.into(),
            dependent_task_id: dependent.into(),
        }
    }
}

/// Lifecycle of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl GoalStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "open" => Ok(Self::Pending),
            "in_progress" | "in-progress" | "doing" => Ok(Self::InProgress),
            "completed" | "done" => Ok(Self::Completed),
            other => Err(format!("unknown goal status '{other}'")),
        }
    }
}

/// A goal grouping tasks and habits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    #[serde(default)]
    pub status: GoalStatus,
}

/// Derived streak statistics for one habit. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakSummary {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_completions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completed: Option<CalendarDate>,
}

/// Derived blocked/unblocked status for one task.
///
/// `blockers` lists only the *active* blockers: existing tasks that are not
/// yet complete, sorted by id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockStatus {
    pub is_blocked: bool,
    pub blockers: Vec<TaskId>,
}

impl BlockStatus {
    /// Status of a task with no active blockers.
    #[must_use]
    pub const fn unblocked() -> Self {
        Self {
            is_blocked: false,
            blockers: Vec::new(),
        }
    }

    pub(crate) fn from_active(blockers: Vec<TaskId>) -> Self {
        Self {
            is_blocked: !blockers.is_empty(),
            blockers,
        }
    }
}
