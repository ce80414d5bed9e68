//! End-to-end smoke test of the rebuilt tool.
//!
//! The tool generates and compiles the fixture into a fresh output
//! directory; the resulting executable is then run and its output checked.
//! Each step is fatal, and a later step never runs after an earlier one
//! fails.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::core::error::HarnessError;
use crate::core::fixture::Fixture;
use crate::core::template::{self, Vars};
use crate::util::config::HarnessConfig;
use crate::util::fs::list_files;
use crate::util::process::{describe_output, ProcessBuilder};
use crate::util::shell::{Shell, Status};

/// Files listed when the expected executable is missing.
const LISTING_LIMIT: usize = 20;

/// How to drive the tool and where to look for its output.
#[derive(Debug, Clone)]
pub struct SmokeOptions {
    /// Arguments for the generate invocation (templated)
    pub generate_args: Vec<String>,

    /// Artifact location relative to the output directory (templated)
    pub artifact_path: String,

    /// Output profile directory
    pub profile: String,

    /// Require the sentinel on the artifact's stdout
    pub check_sentinel: bool,

    /// Extra environment for both processes
    pub env: BTreeMap<String, String>,

    /// Per-process timeout
    pub timeout: Option<Duration>,
}

impl SmokeOptions {
    pub fn from_config(config: &HarnessConfig) -> Self {
        SmokeOptions {
            generate_args: config.generate_args.clone(),
            artifact_path: config.artifact_path.clone(),
            profile: config.profile.clone(),
            check_sentinel: config.check_sentinel,
            env: config.env.clone(),
            timeout: config.timeout,
        }
    }
}

impl Default for SmokeOptions {
    fn default() -> Self {
        SmokeOptions {
            generate_args: vec!["-g".to_string(), "{manifest}".to_string()],
            artifact_path: "{profile}/{target}".to_string(),
            profile: "release".to_string(),
            check_sentinel: true,
            env: BTreeMap::new(),
            timeout: None,
        }
    }
}

/// What a passing smoke test observed.
#[derive(Debug, Clone)]
pub struct SmokeReport {
    /// The executable the tool produced
    pub artifact: PathBuf,

    /// Stdout of the executable
    pub stdout: String,

    /// Time spent generating and compiling
    pub generate_duration: Duration,

    /// Time spent running the executable
    pub run_duration: Duration,
}

/// Generate, locate, execute and check the sample executable.
pub fn run_smoke_test(
    tool: &Path,
    fixture: &Fixture,
    output_dir: &Path,
    opts: &SmokeOptions,
    shell: &Shell,
) -> Result<SmokeReport, HarnessError> {
    let vars = template_vars(fixture, output_dir, &opts.profile);

    let generate = ProcessBuilder::new(tool)
        .args(opts.generate_args.iter().map(|a| template::expand(a, &vars)))
        .cwd(output_dir)
        .envs(&opts.env)
        .timeout(opts.timeout);
    let command = generate.display_command();

    shell.status(Status::Generating, &command);
    let start = Instant::now();
    let output = generate.exec().map_err(|e| HarnessError::GenerationFailure {
        command: command.clone(),
        detail: format!("{:#}", e),
    })?;
    if !output.status.success() {
        return Err(HarnessError::GenerationFailure {
            command,
            detail: describe_output(&output),
        });
    }
    let generate_duration = start.elapsed();
    tracing::debug!("Generation finished in {:.2?}", generate_duration);

    let artifact = artifact_location(output_dir, &opts.artifact_path, &vars);
    if !artifact.is_file() {
        return Err(HarnessError::ArtifactMissing {
            expected: artifact,
            found: list_files(output_dir, LISTING_LIMIT),
        });
    }

    shell.status(Status::Running, artifact.display());
    let start = Instant::now();
    let output = ProcessBuilder::new(&artifact)
        .cwd(&fixture.root)
        .envs(&opts.env)
        .timeout(opts.timeout)
        .exec()
        .map_err(|e| HarnessError::ArtifactExecutionFailure {
            artifact: artifact.clone(),
            detail: format!("{:#}", e),
        })?;
    if !output.status.success() {
        return Err(HarnessError::ArtifactExecutionFailure {
            artifact,
            detail: describe_output(&output),
        });
    }
    let run_duration = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if opts.check_sentinel && !stdout.contains(&fixture.sentinel) {
        return Err(HarnessError::SentinelMissing {
            artifact,
            sentinel: fixture.sentinel.clone(),
            stdout,
        });
    }

    Ok(SmokeReport {
        artifact,
        stdout,
        generate_duration,
        run_duration,
    })
}

fn template_vars(fixture: &Fixture, output_dir: &Path, profile: &str) -> Vars {
    let mut vars = Vars::new();
    vars.insert("manifest", fixture.manifest.display().to_string());
    vars.insert("fixture", fixture.root.display().to_string());
    vars.insert("output", output_dir.display().to_string());
    vars.insert("profile", profile.to_string());
    vars.insert("target", fixture.target.clone());
    vars
}

/// Where the tool is expected to put the sample executable.
pub fn artifact_location(output_dir: &Path, artifact_path: &str, vars: &Vars) -> PathBuf {
    let path = output_dir.join(template::expand(artifact_path, vars));
    if cfg!(windows) && path.extension().is_none() {
        path.with_extension(std::env::consts::EXE_EXTENSION)
    } else {
        path
    }
}
