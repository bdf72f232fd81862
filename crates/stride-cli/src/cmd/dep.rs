//! `stride dep-check` — would adding `blocking → dependent` be accepted?
//!
//! Runs the same checks as a real insert (self-dependency, cycle policy,
//! unknown tasks) against the snapshot and reports the dependent's
//! resulting block status. Nothing is written back.

use std::io::Write;

use clap::Args;
use serde::Serialize;

use stride_core::aggregate::TaskBoard;
use stride_core::config::EngineConfig;
use stride_core::graph::CycleWarning;
use stride_core::model::{BlockStatus, TaskId};

use super::{SnapshotArgs, load_snapshot};
use crate::output::{OutputMode, fail, pretty_kv, render};

#[derive(Args, Debug)]
pub struct DepCheckArgs {
    #[command(flatten)]
    pub source: SnapshotArgs,

    /// Task that must finish first.
    pub blocking: String,

    /// Task that would wait on it.
    pub dependent: String,
}

#[derive(Debug, Serialize)]
struct DepCheckOutput {
    ok: bool,
    blocking: TaskId,
    dependent: TaskId,
    status: BlockStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<CycleWarning>,
}

pub fn run_dep_check(
    args: &DepCheckArgs,
    output: OutputMode,
    config: &EngineConfig,
) -> anyhow::Result<()> {
    let loaded = load_snapshot(&args.source.snapshot)?;
    let mut board = TaskBoard::new(
        &loaded.snapshot.tasks,
        &loaded.snapshot.edges,
        config.cycle_policy,
    );

    let blocking = TaskId::new(args.blocking.trim());
    let dependent = TaskId::new(args.dependent.trim());
    let change = board
        .add_dependency(&blocking, &dependent)
        .map_err(|err| fail(output, &err))?;

    let payload = DepCheckOutput {
        ok: true,
        blocking,
        dependent,
        status: change.status,
        warning: change.warning,
    };
    render(output, &payload, render_dep_check_human)
}

fn render_dep_check_human(payload: &DepCheckOutput, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "✓ {} → {} accepted", payload.blocking, payload.dependent)?;
    let state = if payload.status.is_blocked {
        let blockers: Vec<&str> = payload.status.blockers.iter().map(TaskId::as_str).collect();
        format!("blocked by {}", blockers.join(", "))
    } else {
        "unblocked".to_string()
    };
    pretty_kv(w, payload.dependent.as_str(), state)?;
    if let Some(warning) = &payload.warning {
        writeln!(w, "warning: {warning}")?;
    }
    Ok(())
}
