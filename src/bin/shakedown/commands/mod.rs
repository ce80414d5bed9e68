//! Command implementations

pub mod completions;
pub mod fixture;
pub mod init;
pub mod run;

use shakedown::util::shell::ColorChoice;

/// Flags shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct GlobalFlags {
    pub verbose: bool,
    pub quiet: bool,
    pub color: ColorChoice,
}
