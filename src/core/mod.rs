//! Core data structures for shakedown.
//!
//! This module contains the types shared by every stage:
//! - Errors and failure kinds
//! - Modules under test and their results
//! - The sample fixture
//! - Stage reports and the final verdict

pub mod error;
pub mod fixture;
pub mod module;
pub mod stage;
pub mod template;
pub mod verdict;

pub use error::{FailureKind, HarnessError};
pub use fixture::{create_fixture, populate_fixture, Fixture, FixtureSpec, DEFAULT_SENTINEL};
pub use module::{ModuleResult, ModuleSpec};
pub use stage::{StageReport, StageState};
pub use verdict::{FailureSummary, Verdict};
