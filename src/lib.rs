//! Shakedown - a build-validation harness for build tools
//!
//! This crate provides the library behind the `shakedown` command: it runs
//! the unit-test suites of a build tool's modules, rebuilds the tool, and
//! smoke-tests it end to end against a throwaway sample project, producing
//! a single pass/fail verdict.

pub mod core;
pub mod ops;
pub mod util;

/// Test utilities for shakedown unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides fake build tools and sandboxed source roots.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{FailureKind, Fixture, FixtureSpec, HarnessError, ModuleSpec, Verdict};
pub use ops::{Harness, OutputFormat};
pub use util::config::{Config, ConfigOverrides, HarnessConfig};
