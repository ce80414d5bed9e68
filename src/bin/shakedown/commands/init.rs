//! `shakedown init` command

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::InitArgs;
use crate::commands::GlobalFlags;
use shakedown::ops::init::{init_config, InitOptions};
use shakedown::util::shell::{Shell, Status};

pub fn execute(args: InitArgs, flags: &GlobalFlags) -> Result<()> {
    let dir = args.path.unwrap_or_else(|| PathBuf::from("."));
    let shell = Shell::from_flags(flags.quiet, flags.verbose, flags.color, false);

    let path = init_config(&dir, &InitOptions { binary: args.binary })?;
    shell.status(Status::Created, path.display());

    Ok(())
}
