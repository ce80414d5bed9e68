//! The aggregate result of one harness run.

use std::time::Duration;

use serde::Serialize;

use crate::core::error::{FailureKind, HarnessError};
use crate::core::module::ModuleResult;
use crate::core::stage::{StageReport, StageState};

pub(crate) fn serialize_duration_ms<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// The first failure of a run.
#[derive(Debug, Clone, Serialize)]
pub struct FailureSummary {
    /// Stage that failed
    pub stage: String,

    /// Error kind
    pub kind: FailureKind,

    /// Error message
    pub message: String,

    /// Captured output, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Final aggregate of a run.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    /// Whether every stage succeeded
    pub passed: bool,

    /// Per-stage outcomes, in execution order
    pub stages: Vec<StageReport>,

    /// Per-module test outcomes, in execution order
    pub modules: Vec<ModuleResult>,

    /// The failure that aborted the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureSummary>,

    /// Problems met while removing scratch directories
    pub cleanup_warnings: Vec<String>,

    /// Total run time (in milliseconds for JSON)
    #[serde(serialize_with = "serialize_duration_ms")]
    pub total_duration: Duration,

    /// Exit code for the harness process
    pub exit_code: i32,
}

impl Verdict {
    /// Build the verdict from the stage reports and the aborting error.
    ///
    /// Cleanup warnings never change the outcome.
    pub fn new(
        stages: Vec<StageReport>,
        modules: Vec<ModuleResult>,
        failure: Option<(&str, &HarnessError)>,
        cleanup_warnings: Vec<String>,
        total_duration: Duration,
    ) -> Self {
        let failure = failure.map(|(stage, error)| FailureSummary {
            stage: stage.to_string(),
            kind: error.kind(),
            message: error.to_string(),
            detail: error.detail(),
        });
        let exit_code = failure.as_ref().map_or(0, |f| f.kind.exit_code());

        Verdict {
            passed: failure.is_none(),
            stages,
            modules,
            failure,
            cleanup_warnings,
            total_duration,
            exit_code,
        }
    }

    /// The single-word outcome printed as the last line of a run.
    pub fn label(&self) -> &'static str {
        if self.passed {
            "SUCCESS"
        } else {
            "FAILURE"
        }
    }

    /// Get count of succeeded stages.
    pub fn succeeded_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| s.state == StageState::Succeeded)
            .count()
    }

    /// Look up a stage report by name.
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.name == name)
    }
}
