//! `stride complete` — mark a task done (or not done) and report which
//! dependents changed state.

use std::io::Write;

use clap::Args;
use serde::Serialize;

use stride_core::aggregate::{TaskBoard, TaskCompletionOutcome};
use stride_core::config::EngineConfig;
use stride_core::model::TaskId;

use super::{SnapshotArgs, load_snapshot};
use crate::output::{OutputMode, fail, pretty_kv, pretty_section, render};

#[derive(Args, Debug)]
pub struct CompleteArgs {
    #[command(flatten)]
    pub source: SnapshotArgs,

    /// Task to update.
    pub task: String,

    /// Mark the task incomplete instead.
    #[arg(long)]
    pub undo: bool,
}

#[derive(Debug, Serialize)]
struct CompleteOutput {
    ok: bool,
    task: TaskId,
    completed: bool,
    #[serde(flatten)]
    outcome: TaskCompletionOutcome,
}

pub fn run_complete(
    args: &CompleteArgs,
    output: OutputMode,
    config: &EngineConfig,
) -> anyhow::Result<()> {
    let loaded = load_snapshot(&args.source.snapshot)?;
    let mut board = TaskBoard::new(
        &loaded.snapshot.tasks,
        &loaded.snapshot.edges,
        config.cycle_policy,
    );

    let task = TaskId::new(args.task.trim());
    let completed = !args.undo;
    let outcome = board
        .apply_task_completion(&task, completed)
        .map_err(|err| fail(output, &err))?;

    let payload = CompleteOutput {
        ok: true,
        task,
        completed,
        outcome,
    };
    render(output, &payload, render_complete_human)
}

fn render_complete_human(payload: &CompleteOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let verb = if payload.completed { "completed" } else { "reopened" };
    writeln!(w, "✓ {} {verb}", payload.task)?;

    if payload.outcome.updated_block_statuses.is_empty() {
        return Ok(());
    }

    writeln!(w)?;
    pretty_section(w, "Dependents")?;
    for (task, status) in &payload.outcome.updated_block_statuses {
        let state = if status.is_blocked {
            let blockers: Vec<&str> = status.blockers.iter().map(TaskId::as_str).collect();
            format!("blocked by {}", blockers.join(", "))
        } else {
            "unblocked".to_string()
        };
        pretty_kv(w, task.as_str(), state)?;
    }
    Ok(())
}
