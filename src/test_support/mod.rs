//! Test utilities for shakedown unit tests.
//!
//! This module provides fake build tools (small shell scripts) that emulate
//! a correct tool and the ways a broken one fails, plus a [`Sandbox`] that
//! lays out a throwaway source root and resolves a [`HarnessConfig`] for it.
//!
//! # Example
//!
//! ```rust,ignore
//! use shakedown::test_support::{FakeTool, Sandbox};
//!
//! #[test]
//! fn test_example() {
//!     let sandbox = Sandbox::new();
//!     let config = sandbox.config(FakeTool::Correct);
//!     let verdict = Harness::new(config).run();
//!     assert!(verdict.passed);
//! }
//! ```

pub mod fixtures;

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::fixture::DEFAULT_SENTINEL;
use crate::util::fs::make_executable;

pub use fixtures::*;

/// File the fake tools' artifacts touch when executed.
pub const ARTIFACT_MARKER: &str = "artifact-ran";

/// Behaviours of a fake build tool.
///
/// Every tool is invoked as `tool -g <manifest>` with the output directory
/// as its working directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeTool {
    /// Produces `release/x`, which prints the sentinel and exits 0.
    Correct,
    /// Produces `release/x`, then exits 1.
    FailingGenerator,
    /// Exits 0 without producing an executable.
    NoArtifact,
    /// Produces `release/x`, which exits 2.
    FailingArtifact,
    /// Produces `release/x`, which exits 0 without the sentinel.
    WrongOutput,
    /// Never finishes.
    Hanging,
}

impl FakeTool {
    /// Write the tool into `dir` and return its path.
    ///
    /// Artifacts it produces touch `dir/artifact-ran` when executed.
    pub fn install(self, dir: &Path) -> PathBuf {
        let marker = dir.join(ARTIFACT_MARKER);
        write_script(dir, "fake-tool", &self.body(&marker))
    }

    fn body(self, marker: &Path) -> String {
        let artifact = |behaviour: &str| {
            format!(
                "mkdir -p release\ncat > release/x <<'ARTIFACT'\n#!/bin/sh\ntouch '{}'\n{}\nARTIFACT\nchmod +x release/x\n",
                marker.display(),
                behaviour
            )
        };
        let check_args = "[ \"$1\" = \"-g\" ] || { echo \"usage: fake-tool -g <manifest>\" >&2; exit 64; }\n\
                          [ -f \"$2\" ] || { echo \"no such project description: $2\" >&2; exit 66; }\n";
        let sentinel = format!("echo \"{}\"", DEFAULT_SENTINEL);

        match self {
            FakeTool::Correct => format!("{}{}", check_args, artifact(&sentinel)),
            FakeTool::FailingGenerator => format!(
                "{}{}echo \"error: MMK_SOURCES: no such file\" >&2\nexit 1\n",
                check_args,
                artifact(&sentinel)
            ),
            FakeTool::NoArtifact => format!("{}echo \"all:\" > Makefile\n", check_args),
            FakeTool::FailingArtifact => format!(
                "{}{}",
                check_args,
                artifact("echo \"Segmentation fault\" >&2\nexit 2")
            ),
            FakeTool::WrongOutput => format!("{}{}", check_args, artifact("echo \"Hello, world\"")),
            FakeTool::Hanging => "exec sleep 5\n".to_string(),
        }
    }
}

/// Write an executable `/bin/sh` script.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    make_executable(&path).unwrap();
    path
}

/// An argv running `script` through `sh -c`.
pub fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}
