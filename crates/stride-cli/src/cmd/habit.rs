//! `stride habit` — one habit's streak summary, optionally after marking a
//! day done (`--add`) or undoing it (`--remove`).

use std::io::Write;

use clap::Args;
use serde::Serialize;
use tracing::info;

use stride_core::aggregate::{EventMutation, apply_event_mutation};
use stride_core::date::{CalendarDate, Clock};
use stride_core::model::{CompletionEvent, HabitId, StreakSummary};
use stride_core::streak;

use super::{SnapshotArgs, as_of_or_today, load_snapshot, parse_date};
use crate::output::{OutputMode, fail, pretty_kv, pretty_section, render};

#[derive(Args, Debug)]
pub struct HabitArgs {
    #[command(flatten)]
    pub source: SnapshotArgs,

    /// Habit to summarize.
    pub habit: String,

    /// Reporting day (YYYY-MM-DD). Defaults to today in UTC.
    #[arg(long, value_parser = parse_date)]
    pub as_of: Option<CalendarDate>,

    /// Record a completion on this day before summarizing.
    #[arg(long, value_parser = parse_date, group = "mutation", value_name = "DATE")]
    pub add: Option<CalendarDate>,

    /// Delete one completion on this day before summarizing.
    #[arg(long, value_parser = parse_date, group = "mutation", value_name = "DATE")]
    pub remove: Option<CalendarDate>,
}

impl HabitArgs {
    fn mutation(&self) -> Option<EventMutation> {
        self.add
            .map(EventMutation::Add)
            .or_else(|| self.remove.map(EventMutation::Remove))
    }
}

#[derive(Debug, Serialize)]
struct HabitOutput {
    habit: HabitId,
    as_of: CalendarDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    mutation: Option<EventMutation>,
    #[serde(flatten)]
    summary: StreakSummary,
}

pub fn run_habit(
    args: &HabitArgs,
    output: OutputMode,
    clock: &impl Clock,
) -> anyhow::Result<()> {
    let loaded = load_snapshot(&args.source.snapshot)?;
    let habit = HabitId::new(args.habit.trim());
    let as_of = as_of_or_today(args.as_of, clock);

    let events: Vec<CompletionEvent> = loaded
        .snapshot
        .events
        .into_iter()
        .filter(|event| event.habit_id == habit)
        .collect();

    let mutation = args.mutation();
    if let Some(EventMutation::Add(date)) = mutation
        && streak::has_completion_on(&events, date)
    {
        info!(%habit, %date, "day already completed, streak unchanged");
    }
    let summary = match mutation {
        Some(mutation) => apply_event_mutation(&habit, &events, mutation, as_of)
            .map_err(|err| fail(output, &err))?,
        None => streak::summarize(&events, as_of),
    };

    let payload = HabitOutput {
        habit,
        as_of,
        mutation,
        summary,
    };
    render(output, &payload, render_habit_human)
}

fn render_habit_human(payload: &HabitOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("{} as of {}", payload.habit, payload.as_of))?;
    pretty_kv(w, "current", payload.summary.current_streak.to_string())?;
    pretty_kv(w, "longest", payload.summary.longest_streak.to_string())?;
    pretty_kv(w, "total", payload.summary.total_completions.to_string())?;
    let last = payload
        .summary
        .last_completed
        .map_or_else(|| "never".to_string(), |d| d.to_string());
    pretty_kv(w, "last", last)
}
