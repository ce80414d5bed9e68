//! Stage lifecycle state and per-stage reports.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::core::error::{FailureKind, HarnessError};

/// Lifecycle of a stage within one run.
///
/// The only transitions are `Pending -> Running -> Succeeded | Failed`.
/// Stages after a failure stay `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageState::Pending => write!(f, "pending"),
            StageState::Running => write!(f, "running"),
            StageState::Succeeded => write!(f, "succeeded"),
            StageState::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    /// Stage name
    pub name: String,

    /// Position in the stage list
    pub ordinal: usize,

    /// Final state
    pub state: StageState,

    /// One-line summary (or the error message on failure)
    pub message: String,

    /// Failure kind, if the stage failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,

    /// Captured output of the failing process, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// How long the stage took (in milliseconds for JSON)
    #[serde(serialize_with = "crate::core::verdict::serialize_duration_ms")]
    pub duration: Duration,
}

impl StageReport {
    /// A stage that has not run.
    pub fn pending(name: impl Into<String>, ordinal: usize) -> Self {
        StageReport {
            name: name.into(),
            ordinal,
            state: StageState::Pending,
            message: "not run".to_string(),
            kind: None,
            detail: None,
            duration: Duration::ZERO,
        }
    }

    pub fn start(&mut self) {
        debug_assert_eq!(self.state, StageState::Pending);
        self.state = StageState::Running;
    }

    pub fn succeed(&mut self, message: impl Into<String>, duration: Duration) {
        debug_assert_eq!(self.state, StageState::Running);
        self.state = StageState::Succeeded;
        self.message = message.into();
        self.duration = duration;
    }

    pub fn fail(&mut self, error: &HarnessError, duration: Duration) {
        debug_assert_eq!(self.state, StageState::Running);
        self.state = StageState::Failed;
        self.message = error.to_string();
        self.kind = Some(error.kind());
        self.detail = error.detail();
        self.duration = duration;
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, StageState::Succeeded | StageState::Failed)
    }
}
