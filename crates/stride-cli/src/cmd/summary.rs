//! `stride summary` — streaks, blocking state, goal progress and analytics
//! for a whole snapshot.

use std::io::Write;

use clap::Args;
use serde::Serialize;

use stride_core::aggregate::{SnapshotSummary, SnapshotWarning, summarize_snapshot};
use stride_core::config::EngineConfig;
use stride_core::date::{CalendarDate, Clock};
use stride_core::graph::DanglingEnd;
use stride_core::model::TaskId;
use stride_core::store::RejectedRecord;

use super::{SnapshotArgs, as_of_or_today, load_snapshot, parse_date};
use crate::output::{OutputMode, pretty_kv, pretty_section, render};

#[derive(Args, Debug)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: SnapshotArgs,

    /// Reporting day (YYYY-MM-DD). Defaults to today in UTC.
    #[arg(long, value_parser = parse_date)]
    pub as_of: Option<CalendarDate>,
}

#[derive(Debug, Serialize)]
struct SummaryOutput {
    #[serde(flatten)]
    summary: SnapshotSummary,
    rejected: Vec<RejectedRecord>,
}

pub fn run_summary(
    args: &SummaryArgs,
    output: OutputMode,
    config: &EngineConfig,
    clock: &impl Clock,
) -> anyhow::Result<()> {
    let loaded = load_snapshot(&args.source.snapshot)?;
    let as_of = as_of_or_today(args.as_of, clock);
    let payload = SummaryOutput {
        summary: summarize_snapshot(&loaded.snapshot, as_of, config),
        rejected: loaded.rejected,
    };
    render(output, &payload, render_summary_human)
}

fn render_summary_human(payload: &SummaryOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let summary = &payload.summary;
    pretty_section(w, &format!("Summary as of {}", summary.as_of))?;
    pretty_kv(w, "goals done", summary.analytics.goals_completed.to_string())?;
    pretty_kv(w, "tasks done", summary.analytics.tasks_completed.to_string())?;
    pretty_kv(w, "tracked today", summary.analytics.habits_tracked_today.to_string())?;

    if !summary.habits.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Habits")?;
        for (habit, streak) in &summary.habits {
            let last = streak
                .last_completed
                .map_or_else(|| "never".to_string(), |d| d.to_string());
            pretty_kv(
                w,
                habit.as_str(),
                format!(
                    "current {}  longest {}  total {}  last {last}",
                    streak.current_streak, streak.longest_streak, streak.total_completions
                ),
            )?;
        }
    }

    if !summary.tasks.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Tasks")?;
        for (task, status) in &summary.tasks {
            let state = if status.is_blocked {
                let blockers: Vec<&str> = status.blockers.iter().map(TaskId::as_str).collect();
                format!("blocked by {}", blockers.join(", "))
            } else if summary.ready_tasks.contains(task) {
                "ready".to_string()
            } else {
                "done".to_string()
            };
            pretty_kv(w, task.as_str(), state)?;
        }
    }

    if !summary.goals.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Goals")?;
        for (goal, progress) in &summary.goals {
            pretty_kv(w, goal.as_str(), progress.to_string())?;
        }
    }

    if !summary.warnings.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Warnings")?;
        for warning in &summary.warnings {
            let code = warning.code().code();
            match warning {
                SnapshotWarning::DanglingEdge(dangling) => {
                    let missing = match dangling.missing {
                        DanglingEnd::Blocking => &dangling.edge.blocking_task_id,
                        DanglingEnd::Dependent => &dangling.edge.dependent_task_id,
                    };
                    writeln!(
                        w,
                        "  [{code}] dangling edge {} → {} (missing '{missing}')",
                        dangling.edge.blocking_task_id, dangling.edge.dependent_task_id
                    )?;
                }
                SnapshotWarning::Cycle(cycle) => writeln!(w, "  [{code}] {cycle}")?,
            }
        }
    }

    if !payload.rejected.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Rejected records")?;
        for record in &payload.rejected {
            writeln!(
                w,
                "  {:?} #{}: {} {:?}",
                record.kind,
                record.index,
                record.reason.code(),
                record.reason
            )?;
        }
    }

    Ok(())
}
