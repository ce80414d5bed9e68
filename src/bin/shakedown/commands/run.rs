//! `shakedown run` command

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};

use crate::cli::RunArgs;
use crate::commands::GlobalFlags;
use shakedown::ops::format::{format_verdict, OutputFormat};
use shakedown::ops::Harness;
use shakedown::util::config::{
    global_config_path, load_config, ConfigError, ConfigOverrides, CONFIG_FILE_NAME,
};
use shakedown::util::diagnostic::suggestions;
use shakedown::util::fs::absolutize;
use shakedown::util::shell::{format_duration, Shell, Status};

/// Returns the process exit code: 0 on success, the failure kind's code otherwise.
pub fn execute(args: RunArgs, flags: &GlobalFlags) -> Result<i32> {
    let output_format: OutputFormat = args
        .output_format
        .parse()
        .with_context(|| format!("invalid output format: {}", args.output_format))?;

    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let (source_root, config_path) = locate(&cwd, args.source_root.as_deref(), args.config.as_deref());

    if !config_path.exists() {
        bail!(
            "could not find `{}`\n\nhelp: {}",
            config_path.display(),
            suggestions::NO_CONFIG
        );
    }

    let config = load_config(global_config_path().as_deref(), &config_path)?;
    let overrides = ConfigOverrides {
        fixture_root: args.fixture_root.map(|p| absolutize(&cwd, &p)),
        output_root: args.output_root.map(|p| absolutize(&cwd, &p)),
        timeout_secs: args.timeout,
        modules: args.modules,
    };
    let harness_config = config
        .resolve(&source_root, &overrides)
        .map_err(|e| config_error(e, &config_path))?;

    let shell = Arc::new(Shell::from_flags(
        flags.quiet,
        flags.verbose,
        flags.color,
        output_format == OutputFormat::Json,
    ));
    tracing::debug!("Resolved configuration: {:?}", harness_config);

    let harness = Harness::new(harness_config).with_shell(Arc::clone(&shell));
    shell.verbose(
        Status::Info,
        format!("stages: {}", harness.stage_names().join(" -> ")),
    );
    let verdict = harness.run();

    shell.status(
        Status::Finished,
        format!("{} in {}", verdict.label(), format_duration(verdict.total_duration)),
    );
    print!("{}", format_verdict(&verdict, output_format, flags.verbose));

    Ok(verdict.exit_code)
}

/// Work out the source root and configuration file from the flags.
///
/// An explicit `--config` without `--source-root` puts the source root next
/// to the configuration file.
fn locate(cwd: &Path, source_root: Option<&Path>, config: Option<&Path>) -> (PathBuf, PathBuf) {
    let config = config.map(|p| absolutize(cwd, p));
    let source_root = match (source_root, &config) {
        (Some(root), _) => absolutize(cwd, root),
        (None, Some(config)) => config
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf()),
        (None, None) => cwd.to_path_buf(),
    };
    let config = config.unwrap_or_else(|| source_root.join(CONFIG_FILE_NAME));
    (source_root, config)
}

fn config_error(error: ConfigError, config_path: &Path) -> anyhow::Error {
    let help = match &error {
        ConfigError::MissingBinary => Some(suggestions::NO_CONFIG),
        ConfigError::UnknownModule { .. } => Some(suggestions::UNKNOWN_MODULE),
        _ => None,
    };
    match help {
        Some(help) => anyhow!("{} ({})\n\nhelp: {}", error, config_path.display(), help),
        None => anyhow!("{} ({})", error, config_path.display()),
    }
}
