//! Stage error types and diagnostics.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// A fatal failure of one harness stage.
///
/// Every variant aborts the run; none are retried.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum HarnessError {
    #[error("test suite for module `{module}` failed")]
    #[diagnostic(
        code(shakedown::modules::test_failure),
        help("run the module's test command in its directory to reproduce")
    )]
    ModuleTestFailure { module: String, detail: String },

    #[error("tool failed to rebuild with `{command}`")]
    #[diagnostic(
        code(shakedown::rebuild::failure),
        help("fix the compile errors above; no smoke test runs against a tool that does not build")
    )]
    RebuildFailure { command: String, detail: String },

    #[error("directory already exists: {}", .path.display())]
    #[diagnostic(
        code(shakedown::fixture::collision),
        help("remove the leftover directory from a previous run, or pick another --fixture-root/--output-root")
    )]
    FixtureCollision { path: PathBuf },

    #[error("tool failed to generate the sample project with `{command}`")]
    #[diagnostic(code(shakedown::smoke::generation_failure))]
    GenerationFailure { command: String, detail: String },

    #[error("expected executable not found at {}", .expected.display())]
    #[diagnostic(
        code(shakedown::smoke::artifact_missing),
        help("check `tool.artifact_path` and `tool.profile` in Shakedown.toml")
    )]
    ArtifactMissing {
        expected: PathBuf,
        found: Vec<PathBuf>,
    },

    #[error("sample executable {} exited unsuccessfully", .artifact.display())]
    #[diagnostic(code(shakedown::smoke::artifact_execution_failure))]
    ArtifactExecutionFailure { artifact: PathBuf, detail: String },

    #[error("sample executable did not print `{sentinel}`")]
    #[diagnostic(code(shakedown::smoke::sentinel_missing))]
    SentinelMissing {
        artifact: PathBuf,
        sentinel: String,
        stdout: String,
    },

    #[error("stage `{stage}` panicked: {message}")]
    #[diagnostic(code(shakedown::harness::panic))]
    StagePanicked { stage: String, message: String },

    #[error("{context}")]
    #[diagnostic(code(shakedown::io))]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure kind, as reported in the verdict and mapped to an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ModuleTestFailure,
    RebuildFailure,
    FixtureCollision,
    GenerationFailure,
    ArtifactMissing,
    ArtifactExecutionFailure,
    SentinelMissing,
    StagePanicked,
    Io,
}

impl FailureKind {
    /// Process exit code for this kind of failure.
    pub fn exit_code(self) -> i32 {
        match self {
            FailureKind::ModuleTestFailure => 10,
            FailureKind::RebuildFailure => 11,
            FailureKind::FixtureCollision => 12,
            FailureKind::GenerationFailure => 13,
            FailureKind::ArtifactMissing => 14,
            FailureKind::ArtifactExecutionFailure => 15,
            FailureKind::SentinelMissing => 16,
            FailureKind::StagePanicked => 17,
            FailureKind::Io => 18,
        }
    }

    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::ModuleTestFailure => "module_test_failure",
            FailureKind::RebuildFailure => "rebuild_failure",
            FailureKind::FixtureCollision => "fixture_collision",
            FailureKind::GenerationFailure => "generation_failure",
            FailureKind::ArtifactMissing => "artifact_missing",
            FailureKind::ArtifactExecutionFailure => "artifact_execution_failure",
            FailureKind::SentinelMissing => "sentinel_missing",
            FailureKind::StagePanicked => "stage_panicked",
            FailureKind::Io => "io",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl HarnessError {
    /// Wrap an I/O error with a description of what was being done.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        HarnessError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            HarnessError::ModuleTestFailure { .. } => FailureKind::ModuleTestFailure,
            HarnessError::RebuildFailure { .. } => FailureKind::RebuildFailure,
            HarnessError::FixtureCollision { .. } => FailureKind::FixtureCollision,
            HarnessError::GenerationFailure { .. } => FailureKind::GenerationFailure,
            HarnessError::ArtifactMissing { .. } => FailureKind::ArtifactMissing,
            HarnessError::ArtifactExecutionFailure { .. } => FailureKind::ArtifactExecutionFailure,
            HarnessError::SentinelMissing { .. } => FailureKind::SentinelMissing,
            HarnessError::StagePanicked { .. } => FailureKind::StagePanicked,
            HarnessError::Io { .. } => FailureKind::Io,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }

    /// Captured output or other free-form detail, if the error carries any.
    pub fn detail(&self) -> Option<String> {
        match self {
            HarnessError::ModuleTestFailure { detail, .. }
            | HarnessError::RebuildFailure { detail, .. }
            | HarnessError::GenerationFailure { detail, .. }
            | HarnessError::ArtifactExecutionFailure { detail, .. } => Some(detail.clone()),
            HarnessError::ArtifactMissing { found, .. } => {
                if found.is_empty() {
                    Some("the output directory is empty".to_string())
                } else {
                    let listing: Vec<String> =
                        found.iter().map(|p| format!("  {}", p.display())).collect();
                    Some(format!("the output directory contains:\n{}", listing.join("\n")))
                }
            }
            HarnessError::SentinelMissing { stdout, .. } => {
                Some(format!("--- stdout ---\n{}", stdout.trim_end()))
            }
            HarnessError::Io { source, .. } => Some(source.to_string()),
            HarnessError::FixtureCollision { .. } | HarnessError::StagePanicked { .. } => None,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.to_string())
            .with_context(format!("failure kind: {}", self.kind()));

        match self {
            HarnessError::FixtureCollision { path } => {
                diag = diag.with_location(path.clone());
            }
            HarnessError::ArtifactMissing { expected, .. } => {
                diag = diag.with_location(expected.clone());
            }
            HarnessError::GenerationFailure { .. } => {
                diag = diag.with_suggestion(suggestions::GENERATION_FAILED);
            }
            _ => {}
        }

        if let Some(detail) = self.detail() {
            for line in detail.lines() {
                diag = diag.with_context(line.to_string());
            }
        }

        if let Some(help) = MietteDiagnostic::help(self) {
            diag = diag.with_suggestion(help.to_string());
        }

        diag
    }
}
