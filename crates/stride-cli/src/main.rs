#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error};
use std::env;
use std::path::PathBuf;
use stride_core::config::{EngineConfig, resolve_config};
use stride_core::date::SystemClock;
use stride_core::error::ErrorCode;
use stride_core::graph::CyclePolicy;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "stride: habit streaks, task dependencies and goal progress",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Override the cycle policy for new dependencies (reject | warn).
    #[arg(long, global = true, value_parser = parse_policy)]
    cycle_policy: Option<CyclePolicy>,

    /// Project root holding `.stride/config.toml`. Defaults to the current directory.
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn parse_policy(raw: &str) -> Result<CyclePolicy, String> {
    raw.parse()
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Summarize streaks, blocking state and goal progress",
        after_help = "EXAMPLES:\n    stride summary --snapshot export.json --as-of 2024-01-05\n\n    # Machine-readable output\n    stride summary -s export.json --json"
    )]
    Summary(cmd::summary::SummaryArgs),

    #[command(
        about = "Show one habit's streak, optionally after marking a day",
        after_help = "EXAMPLES:\n    stride habit h1 -s export.json\n\n    # Mark today done and show the new streak\n    stride habit h1 -s export.json --add 2024-01-05 --as-of 2024-01-05"
    )]
    Habit(cmd::habit::HabitArgs),

    #[command(
        about = "Mark a task complete and list dependents that changed",
        after_help = "EXAMPLES:\n    stride complete a -s export.json\n\n    # Reopen a task\n    stride complete a -s export.json --undo"
    )]
    Complete(cmd::complete::CompleteArgs),

    #[command(
        name = "dep-check",
        about = "Check whether a dependency edge would be accepted",
        after_help = "EXAMPLES:\n    # Would 'a' blocking 'b' be allowed?\n    stride dep-check a b -s export.json"
    )]
    DepCheck(cmd::dep::DepCheckArgs),

    #[command(about = "List dependency cycles present in a snapshot")]
    Cycles(cmd::cycles::CyclesArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("STRIDE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "stride=debug,info"
        } else {
            "stride=info,warn"
        })
    });

    let format = env::var("STRIDE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    // Logs go to stderr so stdout stays parseable.
    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let root = match &cli.root {
        Some(root) => root.clone(),
        None => env::current_dir()?,
    };
    match resolve_config(&root, cli.json, cli.cycle_policy) {
        Ok(config) => Ok(config),
        Err(err) => {
            let mode = if cli.json { OutputMode::Json } else { OutputMode::Pretty };
            let code = ErrorCode::ConfigParseError;
            render_error(
                mode,
                &CliError {
                    message: format!("{err:#}"),
                    suggestion: code.hint().map(str::to_string),
                    error_code: Some(code.code().to_string()),
                },
            )?;
            Err(err)
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let config = load_config(&cli)?;
    let output = OutputMode::from_resolved(&config.resolved_output);

    match &cli.command {
        Commands::Summary(args) => cmd::summary::run_summary(args, output, &config, &SystemClock),
        Commands::Habit(args) => cmd::habit::run_habit(args, output, &SystemClock),
        Commands::Complete(args) => cmd::complete::run_complete(args, output, &config),
        Commands::DepCheck(args) => cmd::dep::run_dep_check(args, output, &config),
        Commands::Cycles(args) => cmd::cycles::run_cycles(args, output, &config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["stride", "summary", "-s", "x.json", "--json"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Summary(_)));
    }

    #[test]
    fn as_of_is_normalized() {
        let cli = Cli::parse_from([
            "stride",
            "summary",
            "-s",
            "x.json",
            "--as-of",
            "2024-01-05T23:30:00-02:00",
        ]);
        let Commands::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(args.as_of.map(|d| d.to_string()).as_deref(), Some("2024-01-06"));
    }

    #[test]
    fn bad_as_of_is_rejected_by_parser() {
        let result =
            Cli::try_parse_from(["stride", "summary", "-s", "x.json", "--as-of", "tomorrow"]);
        assert!(result.is_err());
    }

    #[test]
    fn cycle_policy_flag_parses() {
        let cli = Cli::parse_from(["stride", "--cycle-policy", "warn", "cycles", "-s", "x.json"]);
        assert_eq!(cli.cycle_policy, Some(CyclePolicy::Warn));
        let bad = Cli::try_parse_from(["stride", "--cycle-policy", "never", "cycles", "-s", "x"]);
        assert!(bad.is_err());
    }

    #[test]
    fn habit_add_and_remove_conflict() {
        let result = Cli::try_parse_from([
            "stride",
            "habit",
            "h1",
            "-s",
            "x.json",
            "--add",
            "2024-01-01",
            "--remove",
            "2024-01-02",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn dep_check_takes_two_tasks() {
        let cli = Cli::parse_from(["stride", "dep-check", "a", "b", "-s", "x.json"]);
        let Commands::DepCheck(args) = cli.command else {
            panic!("expected dep-check");
        };
        assert_eq!(args.blocking, "a");
        assert_eq!(args.dependent, "b");
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
