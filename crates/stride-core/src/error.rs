use std::fmt;

use crate::model::{HabitId, TaskId};

/// Machine-readable error codes for caller-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InvalidDate,
    MissingField,
    InvalidGoalStatus,
    SelfDependency,
    CycleDetected,
    TaskBlocked,
    TaskNotFound,
    HabitMismatch,
    DanglingEdgeReference,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::InvalidDate => "E2101",
            Self::MissingField => "E2102",
            Self::InvalidGoalStatus => "E2103",
            Self::SelfDependency => "E2201",
            Self::CycleDetected => "E2003",
            Self::TaskBlocked => "E2202",
            Self::TaskNotFound => "E2001",
            Self::HabitMismatch => "E2104",
            Self::DanglingEdgeReference => "E3101",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidDate => "Invalid date",
            Self::MissingField => "Record is missing a required field",
            Self::InvalidGoalStatus => "Invalid goal status",
            Self::SelfDependency => "Task cannot block itself",
            Self::CycleDetected => "Cycle would be created",
            Self::TaskBlocked => "Task is blocked",
            Self::TaskNotFound => "Task not found",
            Self::HabitMismatch => "Event belongs to a different habit",
            Self::DanglingEdgeReference => "Dependency references a missing task",
        }
    }

    /// Optional remediation hint that can be surfaced to the user.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .stride/config.toml and retry."),
            Self::InvalidDate => Some("Use YYYY-MM-DD or an RFC 3339 timestamp."),
            Self::MissingField | Self::TaskNotFound => None,
            Self::InvalidGoalStatus => Some("Use one of: pending, in_progress, completed."),
            Self::SelfDependency => Some("Pick a different blocking task."),
            Self::CycleDetected => Some("Remove/adjust dependency links to keep the graph acyclic."),
            Self::TaskBlocked => Some("Complete the listed blocking tasks first."),
            Self::HabitMismatch => Some("Pass only the events of the habit being updated."),
            Self::DanglingEdgeReference => Some("Delete the dependency; the referenced task is gone."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A precondition the engine refused to violate.
///
/// Every variant is a synchronous, typed rejection; nothing is retried
/// internally since the engine performs no I/O.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A timestamp could not be normalized to a calendar date.
    #[error("invalid date: '{input}'")]
    InvalidDate { input: String },

    /// A task was asked to block itself.
    #[error("task '{task}' cannot block itself")]
    SelfDependency { task: TaskId },

    /// The edge would close a dependency cycle.
    ///
    /// `path` starts and ends at the blocking task of the rejected edge.
    #[error("dependency cycle: {}", join_path(path))]
    CycleDetected { path: Vec<TaskId> },

    /// The task still has incomplete blockers.
    #[error("task '{task}' is blocked by: {}", join_ids(blockers))]
    TaskBlocked { task: TaskId, blockers: Vec<TaskId> },

    /// The task is not part of the snapshot.
    #[error("task not found: '{0}'")]
    TaskNotFound(TaskId),

    /// An event list for one habit contained another habit's event.
    #[error("event for habit '{found}' passed while updating habit '{expected}'")]
    HabitMismatch { expected: HabitId, found: HabitId },
}

impl EngineError {
    /// The stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidDate { .. } => ErrorCode::InvalidDate,
            Self::SelfDependency { .. } => ErrorCode::SelfDependency,
            Self::CycleDetected { .. } => ErrorCode::CycleDetected,
            Self::TaskBlocked { .. } => ErrorCode::TaskBlocked,
            Self::TaskNotFound(_) => ErrorCode::TaskNotFound,
            Self::HabitMismatch { .. } => ErrorCode::HabitMismatch,
        }
    }
}

fn join_path(path: &[TaskId]) -> String {
    path.iter()
        .map(TaskId::as_str)
        .collect::<Vec<_>>()
        .join(" → ")
}

fn join_ids(ids: &[TaskId]) -> String {
    ids.iter().map(TaskId::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::{EngineError, ErrorCode};
    use crate::model::TaskId;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::InvalidDate,
            ErrorCode::MissingField,
            ErrorCode::InvalidGoalStatus,
            ErrorCode::SelfDependency,
            ErrorCode::CycleDetected,
            ErrorCode::TaskBlocked,
            ErrorCode::TaskNotFound,
            ErrorCode::HabitMismatch,
            ErrorCode::DanglingEdgeReference,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::TaskBlocked.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn task_blocked_names_the_blockers() {
        let err = EngineError::TaskBlocked {
            task: TaskId::from("c"),
            blockers: vec![TaskId::from("a"), TaskId::from("b")],
        };
        assert_eq!(err.to_string(), "task 'c' is blocked by: a, b");
        assert_eq!(err.code(), ErrorCode::TaskBlocked);
    }

    #[test]
    fn cycle_display_shows_path() {
        let err = EngineError::CycleDetected {
            path: vec![TaskId::from("b"), TaskId::from("a"), TaskId::from("b")],
        };
        assert_eq!(err.to_string(), "dependency cycle: b → a → b");
    }
}
