//! `stride cycles` — list dependency cycles already present in a snapshot.

use std::io::Write;

use clap::Args;
use serde::Serialize;

use stride_core::config::EngineConfig;
use stride_core::graph::{CycleWarning, DependencyGraph, find_all_cycles};

use super::{SnapshotArgs, load_snapshot};
use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct CyclesArgs {
    #[command(flatten)]
    pub source: SnapshotArgs,
}

#[derive(Debug, Serialize)]
struct CyclesOutput {
    cycles: Vec<CycleWarning>,
}

pub fn run_cycles(
    args: &CyclesArgs,
    output: OutputMode,
    config: &EngineConfig,
) -> anyhow::Result<()> {
    let loaded = load_snapshot(&args.source.snapshot)?;
    let graph = DependencyGraph::from_edges(&loaded.snapshot.edges, config.cycle_policy);
    let payload = CyclesOutput {
        cycles: find_all_cycles(&graph),
    };
    render(output, &payload, render_cycles_human)
}

fn render_cycles_human(payload: &CyclesOutput, w: &mut dyn Write) -> std::io::Result<()> {
    if payload.cycles.is_empty() {
        return writeln!(w, "No dependency cycles found.");
    }
    for (index, cycle) in payload.cycles.iter().enumerate() {
        writeln!(w, "{}. {cycle}", index + 1)?;
    }
    Ok(())
}
