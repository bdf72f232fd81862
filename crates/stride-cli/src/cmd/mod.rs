pub mod complete;
pub mod cycles;
pub mod dep;
pub mod habit;
pub mod summary;

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::warn;

use stride_core::date::{self, CalendarDate, Clock};
use stride_core::store::{LoadedSnapshot, SnapshotFile};

/// The snapshot export every command reads.
#[derive(Args, Debug, Clone)]
pub struct SnapshotArgs {
    /// Path to a JSON snapshot export (habits, events, tasks, edges, goals).
    #[arg(long, short = 's', value_name = "FILE")]
    pub snapshot: PathBuf,
}

/// Parse `--as-of` the same way store timestamps are normalized.
pub fn parse_date(raw: &str) -> Result<CalendarDate, String> {
    date::normalize(raw).map_err(|e| e.to_string())
}

/// Reporting day: the explicit `--as-of`, else `clock`'s today.
pub fn as_of_or_today(as_of: Option<CalendarDate>, clock: &impl Clock) -> CalendarDate {
    as_of.unwrap_or_else(|| clock.today())
}

/// Read and validate a snapshot export, logging every rejected row.
pub fn load_snapshot(path: &Path) -> anyhow::Result<LoadedSnapshot> {
    let loaded = SnapshotFile::from_path(path)?.validate();
    if !loaded.rejected.is_empty() {
        warn!(
            path = %path.display(),
            rejected = loaded.rejected.len(),
            "snapshot contained invalid records"
        );
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stride_core::date::FixedClock;

    #[test]
    fn as_of_falls_back_to_clock() {
        let clock = FixedClock(parse_date("2024-01-05").unwrap());
        let explicit = parse_date("2023-12-31").unwrap();
        assert_eq!(as_of_or_today(None, &clock), clock.0);
        assert_eq!(as_of_or_today(Some(explicit), &clock), explicit);
    }
}
