//! High-level operations.
//!
//! This module contains the stages of a harness run and the implementation
//! of the shakedown commands.

pub mod format;
pub mod harness;
pub mod init;
pub mod module_tests;
pub mod rebuild;
pub mod scratch;
pub mod smoke;

pub use format::{format_verdict, OutputFormat, OutputFormatParseError};
pub use harness::{default_stages, Harness, RunContext, Stage};
pub use init::{init_config, InitOptions};
pub use module_tests::run_module_tests;
pub use rebuild::rebuild;
pub use scratch::Scratch;
pub use smoke::{run_smoke_test, SmokeOptions, SmokeReport};
