//! `shakedown fixture` command
//!
//! Materializes the sample project on its own, for reproducing a smoke-test
//! failure by hand. The directory is left in place.

use anyhow::{Context, Result};

use crate::cli::FixtureArgs;
use crate::commands::GlobalFlags;
use shakedown::core::fixture::{create_fixture, FixtureSpec};
use shakedown::util::diagnostic::emit;
use shakedown::util::fs::absolutize;
use shakedown::util::shell::{Shell, Status};

/// Returns the process exit code.
pub fn execute(args: FixtureArgs, flags: &GlobalFlags) -> Result<i32> {
    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let root = absolutize(&cwd, &args.dir);
    let shell = Shell::from_flags(flags.quiet, flags.verbose, flags.color, false);

    let mut spec = FixtureSpec {
        target: args.target,
        ..FixtureSpec::default()
    };
    if let Some(sentinel) = args.sentinel {
        spec.sentinel = sentinel;
    }

    match create_fixture(&root, &spec) {
        Ok(fixture) => {
            shell.status(Status::Created, format!("fixture in {}", fixture.root.display()));
            println!("{}", fixture.source.display());
            println!("{}", fixture.manifest.display());
            Ok(0)
        }
        Err(e) => {
            emit(&e.to_diagnostic(), shell.use_color());
            Ok(e.exit_code())
        }
    }
}
