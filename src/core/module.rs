//! Modules of the tool under test and their test outcomes.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// An independently testable module of the tool under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSpec {
    /// Module name, unique within a run
    pub name: String,
    /// Absolute directory the module's tests run in
    pub path: PathBuf,
    /// Test command overriding the shared one
    pub test_command: Option<Vec<String>>,
}

impl ModuleSpec {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        ModuleSpec {
            name: name.into(),
            path: path.into(),
            test_command: None,
        }
    }

    pub fn with_test_command(mut self, command: Vec<String>) -> Self {
        self.test_command = Some(command);
        self
    }

    /// The command to run: the module's own override, else `shared`.
    pub fn effective_command<'a>(&'a self, shared: &'a [String]) -> &'a [String] {
        self.test_command.as_deref().unwrap_or(shared)
    }
}

/// Outcome of one module's test suite.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleResult {
    /// Module name
    pub module: String,

    /// Directory the suite ran in
    pub path: PathBuf,

    /// Whether the suite passed
    pub success: bool,

    /// Exit code, if the process exited normally
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    /// Captured process output or the reason the suite could not run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,

    /// Wall-clock time (in milliseconds for JSON)
    #[serde(serialize_with = "crate::core::verdict::serialize_duration_ms")]
    pub duration: Duration,
}

impl ModuleResult {
    pub fn passed(spec: &ModuleSpec, duration: Duration) -> Self {
        ModuleResult {
            module: spec.name.clone(),
            path: spec.path.clone(),
            success: true,
            exit_code: Some(0),
            diagnostic: None,
            duration,
        }
    }

    pub fn failed(
        spec: &ModuleSpec,
        exit_code: Option<i32>,
        diagnostic: impl Into<String>,
        duration: Duration,
    ) -> Self {
        ModuleResult {
            module: spec.name.clone(),
            path: spec.path.clone(),
            success: false,
            exit_code,
            diagnostic: Some(diagnostic.into()),
            duration,
        }
    }
}
