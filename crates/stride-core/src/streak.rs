//! Streak statistics for a single habit.
//!
//! All calculations run over the *distinct* completion dates of the habit,
//! so logging the same habit twice on one day never inflates a streak.
//!
//! # Current streak
//!
//! The run of consecutive days ending at the most recent completion, valid
//! only while that completion is today or yesterday. A habit completed
//! yesterday but not yet today still shows yesterday's streak. A completion
//! dated after `as_of` is still the most recent one, so the run is counted
//! back from it.
//!
//! # Longest streak
//!
//! The longest run of consecutive days anywhere in the history.

#![allow(clippy::module_name_repetitions)]

use std::collections::BTreeSet;

use crate::date::{CalendarDate, days_between, is_consecutive};
use crate::model::{CompletionEvent, StreakSummary};

/// The distinct completion dates of one habit, ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionHistory {
    dates: BTreeSet<CalendarDate>,
}

impl CompletionHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the distinct dates of `events`.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a CompletionEvent>) -> Self {
        events.into_iter().map(|event| event.date).collect()
    }

    /// Record a completion. Returns `false` if the day was already recorded.
    pub fn insert(&mut self, date: CalendarDate) -> bool {
        self.dates.insert(date)
    }

    #[must_use]
    pub fn contains(&self, date: CalendarDate) -> bool {
        self.dates.contains(&date)
    }

    /// Most recent completion date.
    #[must_use]
    pub fn last(&self) -> Option<CalendarDate> {
        self.dates.last().copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of distinct completion days.
    #[must_use]
    pub fn total(&self) -> u32 {
        saturating_u32(self.dates.len())
    }

    #[must_use]
    pub fn current_streak(&self, as_of: CalendarDate) -> u32 {
        let Some(most_recent) = self.last() else {
            return 0;
        };
        if days_between(most_recent, as_of) > 1 {
            return 0;
        }

        let mut streak = 1;
        let mut cursor = most_recent;
        while let Some(prev) = cursor.pred() {
            if !self.dates.contains(&prev) {
                break;
            }
            streak += 1;
            cursor = prev;
        }
        streak
    }

    #[must_use]
    pub fn longest_streak(&self) -> u32 {
        let mut longest = 0;
        let mut running = 0;
        let mut previous: Option<CalendarDate> = None;

        for &date in &self.dates {
            running = match previous {
                Some(prev) if is_consecutive(prev, date) => running + 1,
                _ => 1,
            };
            longest = longest.max(running);
            previous = Some(date);
        }
        longest
    }

    #[must_use]
    pub fn summarize(&self, as_of: CalendarDate) -> StreakSummary {
        StreakSummary {
            current_streak: self.current_streak(as_of),
            longest_streak: self.longest_streak(),
            total_completions: self.total(),
            last_completed: self.last(),
        }
    }
}

impl FromIterator<CalendarDate> for CompletionHistory {
    fn from_iter<I: IntoIterator<Item = CalendarDate>>(iter: I) -> Self {
        Self {
            dates: iter.into_iter().collect(),
        }
    }
}

/// Length of the streak that is still alive on `as_of`.
#[must_use]
pub fn current_streak(events: &[CompletionEvent], as_of: CalendarDate) -> u32 {
    CompletionHistory::from_events(events).current_streak(as_of)
}

/// Longest run of consecutive completion days ever recorded.
#[must_use]
pub fn longest_streak(events: &[CompletionEvent]) -> u32 {
    CompletionHistory::from_events(events).longest_streak()
}

/// Number of distinct completion days.
#[must_use]
pub fn total_completions(events: &[CompletionEvent]) -> u32 {
    CompletionHistory::from_events(events).total()
}

#[must_use]
pub fn summarize(events: &[CompletionEvent], as_of: CalendarDate) -> StreakSummary {
    CompletionHistory::from_events(events).summarize(as_of)
}

/// Whether a completion already exists on `date`.
///
/// Callers check this before inserting a new event so that a double
/// "mark done" does not store a duplicate row.
#[must_use]
pub fn has_completion_on(events: &[CompletionEvent], date: CalendarDate) -> bool {
    events.iter().any(|event| event.date == date)
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::normalize;

    fn d(s: &str) -> CalendarDate {
        normalize(s).unwrap()
    }

    fn events(dates: &[&str]) -> Vec<CompletionEvent> {
        dates
            .iter()
            .map(|date| CompletionEvent::new("h1", d(date)))
            .collect()
    }

    #[test]
    fn empty_history_is_all_zero() {
        let summary = summarize(&[], d("2024-01-05"));
        assert_eq!(summary, StreakSummary::default());
    }

    #[test]
    fn single_completion_today() {
        let summary = summarize(&events(&["2024-01-05"]), d("2024-01-05"));
        assert_eq!(summary.current_streak, 1);
        assert_eq!(summary.longest_streak, 1);
        assert_eq!(summary.total_completions, 1);
        assert_eq!(summary.last_completed, Some(d("2024-01-05")));
    }

    #[test]
    fn yesterday_keeps_streak_alive() {
        let evs = events(&["2024-01-03", "2024-01-04"]);
        assert_eq!(current_streak(&evs, d("2024-01-05")), 2);
    }

    #[test]
    fn two_days_ago_is_stale() {
        let evs = events(&["2024-01-01", "2024-01-02", "2024-01-03"]);
        assert_eq!(current_streak(&evs, d("2024-01-05")), 0);
        assert_eq!(longest_streak(&evs), 3);
    }

    #[test]
    fn gap_breaks_current_run() {
        let evs = events(&["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-05"]);
        assert_eq!(current_streak(&evs, d("2024-01-05")), 1);
        assert_eq!(longest_streak(&evs), 3);
        assert_eq!(total_completions(&evs), 4);
    }

    #[test]
    fn duplicates_do_not_double_count() {
        let evs = events(&["2024-01-04", "2024-01-04", "2024-01-05", "2024-01-05"]);
        assert_eq!(current_streak(&evs, d("2024-01-05")), 2);
        assert_eq!(longest_streak(&evs), 2);
        assert_eq!(total_completions(&evs), 2);
    }

    #[test]
    fn unordered_input() {
        let evs = events(&["2024-01-05", "2024-01-03", "2024-01-04"]);
        assert_eq!(current_streak(&evs, d("2024-01-05")), 3);
    }

    #[test]
    fn streak_crosses_year_boundary() {
        let evs = events(&["2023-12-30", "2023-12-31", "2024-01-01"]);
        assert_eq!(current_streak(&evs, d("2024-01-01")), 3);
        assert_eq!(longest_streak(&evs), 3);
    }

    #[test]
    fn future_dated_completion_anchors_current() {
        let evs = events(&["2024-01-04", "2024-01-05", "2024-01-09"]);
        assert_eq!(current_streak(&evs, d("2024-01-05")), 1);
        assert_eq!(longest_streak(&evs), 2);
        assert_eq!(total_completions(&evs), 3);

        let summary = summarize(&evs, d("2024-01-05"));
        assert_eq!(summary.last_completed, Some(d("2024-01-09")));
    }

    #[test]
    fn future_run_counts_back_from_latest() {
        let evs = events(&["2024-01-06", "2024-01-07"]);
        assert_eq!(current_streak(&evs, d("2024-01-05")), 2);
    }

    #[test]
    fn longest_picks_the_max_run() {
        let evs = events(&[
            "2024-01-01",
            "2024-01-02",
            "2024-01-04",
            "2024-01-05",
            "2024-01-06",
            "2024-01-07",
            "2024-01-09",
        ]);
        assert_eq!(longest_streak(&evs), 4);
    }

    #[test]
    fn same_day_check() {
        let evs = events(&["2024-01-04"]);
        assert!(has_completion_on(&evs, d("2024-01-04")));
        assert!(!has_completion_on(&evs, d("2024-01-05")));
    }

    #[test]
    fn history_insert_reports_duplicates() {
        let mut history = CompletionHistory::new();
        assert!(history.insert(d("2024-01-04")));
        assert!(!history.insert(d("2024-01-04")));
        assert_eq!(history.total(), 1);
    }
}
