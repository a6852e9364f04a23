//! Run and step state machine
//!
//! Pure transition tables plus `can_transition_*` predicates. Every mutation
//! of a run or step status anywhere in the system goes through these checks:
//! the gateway turns a violation into a 400, the worker aborts the run.

use serde::{Deserialize, Serialize};

/// Run lifecycle status, matching the `run_status` Postgres enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "run_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Planned,
    AwaitingReview,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Succeeded | RunStatus::Failed | RunStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "PENDING",
            RunStatus::Planned => "PLANNED",
            RunStatus::AwaitingReview => "AWAITING_REVIEW",
            RunStatus::Running => "RUNNING",
            RunStatus::Succeeded => "SUCCEEDED",
            RunStatus::Failed => "FAILED",
            RunStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step lifecycle status, matching the `step_status` Postgres enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "step_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Succeeded | StepStatus::Failed | StepStatus::Skipped
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Queued => "QUEUED",
            StepStatus::Running => "RUNNING",
            StepStatus::Succeeded => "SUCCEEDED",
            StepStatus::Failed => "FAILED",
            StepStatus::Skipped => "SKIPPED",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allowed run transitions, source -> targets
pub const RUN_TRANSITIONS: &[(RunStatus, &[RunStatus])] = &[
    (
        RunStatus::Pending,
        &[RunStatus::Planned, RunStatus::Cancelled],
    ),
    (
        RunStatus::Planned,
        &[RunStatus::AwaitingReview, RunStatus::Cancelled],
    ),
    (
        RunStatus::AwaitingReview,
        &[RunStatus::Running, RunStatus::Cancelled],
    ),
    (
        RunStatus::Running,
        &[RunStatus::Succeeded, RunStatus::Failed, RunStatus::Cancelled],
    ),
    (RunStatus::Succeeded, &[]),
    (RunStatus::Failed, &[]),
    (RunStatus::Cancelled, &[]),
];

/// Allowed step transitions, source -> targets
pub const STEP_TRANSITIONS: &[(StepStatus, &[StepStatus])] = &[
    (
        StepStatus::Queued,
        &[StepStatus::Running, StepStatus::Skipped],
    ),
    (
        StepStatus::Running,
        &[StepStatus::Succeeded, StepStatus::Failed],
    ),
    (StepStatus::Succeeded, &[]),
    (StepStatus::Failed, &[]),
    (StepStatus::Skipped, &[]),
];

/// Whether a run may move from `current` to `target`
pub fn can_transition_run(current: RunStatus, target: RunStatus) -> bool {
    RUN_TRANSITIONS
        .iter()
        .find(|(source, _)| *source == current)
        .is_some_and(|(_, targets)| targets.contains(&target))
}

/// Whether a step may move from `current` to `target`
pub fn can_transition_step(current: StepStatus, target: StepStatus) -> bool {
    STEP_TRANSITIONS
        .iter()
        .find(|(source, _)| *source == current)
        .is_some_and(|(_, targets)| targets.contains(&target))
}
