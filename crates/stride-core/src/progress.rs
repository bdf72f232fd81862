//! Goal progress and the per-user analytics roll-up.
//!
//! - **Goal progress**: completed linked tasks over all linked tasks.
//! - **Analytics summary**: completed goals, completed tasks, and habits
//!   checked off on the reporting day.

#![allow(
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
)]

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::BuildHasher;

use crate::date::CalendarDate;
use crate::model::{CompletionEvent, Goal, GoalId, GoalStatus, Habit, HabitId, Task};
use crate::streak::has_completion_on;

// ---------------------------------------------------------------------------
// GoalProgress
// ---------------------------------------------------------------------------

/// How many of a goal's tasks are done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GoalProgress {
    /// Linked tasks that are completed.
    pub done: u32,
    /// All linked tasks.
    pub total: u32,
}

impl GoalProgress {
    /// Percentage of work completed, in the range `0.0..=100.0`.
    ///
    /// Returns `100.0` if total is 0 (vacuously complete).
    pub fn percent_complete(&self) -> f32 {
        if self.total == 0 {
            return 100.0;
        }
        (self.done as f32 / self.total as f32) * 100.0
    }

    /// Returns `true` if all tasks are done (or there are none).
    pub fn is_complete(&self) -> bool {
        self.total == 0 || self.done == self.total
    }

    /// Number of tasks not yet done.
    pub fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.done)
    }
}

impl fmt::Display for GoalProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({:.0}%)",
            self.done,
            self.total,
            self.percent_complete()
        )
    }
}

/// Progress of every goal, from the tasks linked to it.
///
/// Tasks pointing at a goal that is not in `goals` are ignored.
pub fn summarize_goals(goals: &[Goal], tasks: &[Task]) -> BTreeMap<GoalId, GoalProgress> {
    let mut progress: BTreeMap<GoalId, GoalProgress> = goals
        .iter()
        .map(|goal| (goal.id.clone(), GoalProgress::default()))
        .collect();

    for task in tasks {
        let Some(entry) = task.goal_id.as_ref().and_then(|id| progress.get_mut(id)) else {
            continue;
        };
        entry.total += 1;
        if task.completed {
            entry.done += 1;
        }
    }

    progress
}

// ---------------------------------------------------------------------------
// AnalyticsSummary
// ---------------------------------------------------------------------------

/// Headline counts for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub goals_completed: u32,
    pub tasks_completed: u32,
    /// Habits with a completion on the reporting day.
    pub habits_tracked_today: u32,
}

pub fn analytics_summary<S: BuildHasher>(
    goals: &[Goal],
    tasks: &[Task],
    habits: &[Habit],
    events_by_habit: &HashMap<HabitId, Vec<CompletionEvent>, S>,
    as_of: CalendarDate,
) -> AnalyticsSummary {
    AnalyticsSummary {
        goals_completed: count(goals.iter().filter(|g| g.status == GoalStatus::Completed)),
        tasks_completed: count(tasks.iter().filter(|t| t.completed)),
        habits_tracked_today: count(habits.iter().filter(|habit| {
            events_by_habit
                .get(&habit.id)
                .is_some_and(|events| has_completion_on(events, as_of))
        })),
    }
}

fn count<T>(iter: impl Iterator<Item = T>) -> u32 {
    u32::try_from(iter.count()).unwrap_or(u32::MAX)
}
