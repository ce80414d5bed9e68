//! Configuration file support for shakedown.
//!
//! Two configuration file locations are read:
//! - Global: `~/.shakedown/config.toml` - user-wide defaults
//! - Project: `Shakedown.toml` in the tool's source root
//!
//! Project config takes precedence over global config, and command-line
//! overrides take precedence over both. [`Config::resolve`] turns the
//! merged file into a [`HarnessConfig`] with every default applied and
//! every path made absolute.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::fixture::{FixtureSpec, DEFAULT_SENTINEL};
use crate::core::module::ModuleSpec;
use crate::core::template;
use crate::util::fs::{absolutize, normalize_path};

/// Name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = "Shakedown.toml";

/// Shakedown configuration, as read from disk.
///
/// Every field is optional so that files can be layered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The tool under test
    pub tool: ToolConfig,

    /// Module test settings
    pub test: TestConfig,

    /// Modules whose test suites run first
    pub modules: Vec<ModuleEntry>,

    /// Sample project settings
    pub fixture: FixtureConfig,

    /// Child process settings
    pub process: ProcessConfig,
}

/// How to build and drive the tool under test.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Command that rebuilds the tool, run in the source root
    pub build_command: Option<Vec<String>>,

    /// Binary produced by the build command (relative to the source root)
    pub binary: Option<PathBuf>,

    /// Arguments for the generate/build invocation; may use placeholders
    pub generate_args: Option<Vec<String>>,

    /// Where the sample executable appears, relative to the output directory
    pub artifact_path: Option<String>,

    /// Output profile directory (e.g. "release" or "debug")
    pub profile: Option<String>,
}

/// Shared module test settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// Command that runs a module's test suite
    pub command: Option<Vec<String>>,
}

/// One `[[modules]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    /// Module name
    pub name: String,

    /// Module directory (relative to the source root)
    pub path: PathBuf,

    /// Test command for this module only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_command: Option<Vec<String>>,
}

/// Sample project settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// Directory the fixture is created in; must not exist
    pub root: Option<PathBuf>,

    /// Directory the tool generates into; must not exist
    pub output: Option<PathBuf>,

    /// Executable target name
    pub target: Option<String>,

    /// Source file name
    pub source: Option<String>,

    /// Project-description file name
    pub manifest: Option<String>,

    /// Line the sample executable prints
    pub sentinel: Option<String>,

    /// Whether the sample's stdout must contain the sentinel
    pub check_sentinel: Option<bool>,
}

/// Child process settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Kill any child still running after this many seconds
    pub timeout_secs: Option<u64>,

    /// Extra environment for every child process
    pub env: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        merge_opt(&mut self.tool.build_command, other.tool.build_command);
        merge_opt(&mut self.tool.binary, other.tool.binary);
        merge_opt(&mut self.tool.generate_args, other.tool.generate_args);
        merge_opt(&mut self.tool.artifact_path, other.tool.artifact_path);
        merge_opt(&mut self.tool.profile, other.tool.profile);

        merge_opt(&mut self.test.command, other.test.command);

        if !other.modules.is_empty() {
            self.modules = other.modules;
        }

        merge_opt(&mut self.fixture.root, other.fixture.root);
        merge_opt(&mut self.fixture.output, other.fixture.output);
        merge_opt(&mut self.fixture.target, other.fixture.target);
        merge_opt(&mut self.fixture.source, other.fixture.source);
        merge_opt(&mut self.fixture.manifest, other.fixture.manifest);
        merge_opt(&mut self.fixture.sentinel, other.fixture.sentinel);
        merge_opt(&mut self.fixture.check_sentinel, other.fixture.check_sentinel);

        merge_opt(&mut self.process.timeout_secs, other.process.timeout_secs);
        self.process.env.extend(other.process.env);
    }

    /// Apply defaults and overrides, producing the configuration a run uses.
    ///
    /// Relative paths in the file are resolved against `source_root`.
    pub fn resolve(
        &self,
        source_root: &Path,
        overrides: &ConfigOverrides,
    ) -> Result<HarnessConfig, ConfigError> {
        let binary = self
            .tool
            .binary
            .as_ref()
            .ok_or(ConfigError::MissingBinary)?;

        let build_command = non_empty(
            "tool.build_command",
            self.tool.build_command.clone(),
            &["cargo", "build", "--release"],
        )?;
        let test_command = non_empty("test.command", self.test.command.clone(), &["cargo", "test"])?;
        let generate_args = self
            .tool
            .generate_args
            .clone()
            .unwrap_or_else(|| vec!["-g".to_string(), "{manifest}".to_string()]);
        let artifact_path = self
            .tool
            .artifact_path
            .clone()
            .unwrap_or_else(|| "{profile}/{target}".to_string());

        for (field, value) in generate_args
            .iter()
            .map(|a| ("tool.generate_args", a.as_str()))
            .chain(std::iter::once(("tool.artifact_path", artifact_path.as_str())))
        {
            if let Some(name) = template::unknown_placeholders(value).into_iter().next() {
                return Err(ConfigError::UnknownPlaceholder {
                    field,
                    placeholder: name,
                });
            }
        }

        let modules = self.resolve_modules(source_root, &overrides.modules)?;

        let defaults = FixtureSpec::default();
        let fixture = FixtureSpec {
            target: self.fixture.target.clone().unwrap_or(defaults.target),
            source_name: self.fixture.source.clone().unwrap_or(defaults.source_name),
            manifest_name: self.fixture.manifest.clone().unwrap_or(defaults.manifest_name),
            sentinel: self
                .fixture
                .sentinel
                .clone()
                .unwrap_or_else(|| DEFAULT_SENTINEL.to_string()),
        };

        let scratch_base = std::env::temp_dir().join("shakedown");
        let fixture_root = overrides
            .fixture_root
            .clone()
            .or_else(|| self.fixture.root.as_ref().map(|p| absolutize(source_root, p)))
            .unwrap_or_else(|| scratch_base.join("fixture"));
        let output_root = overrides
            .output_root
            .clone()
            .or_else(|| self.fixture.output.as_ref().map(|p| absolutize(source_root, p)))
            .unwrap_or_else(|| scratch_base.join("output"));

        // Each root is created and removed as a unit, so neither may hold the other.
        let fixture_root = normalize_path(&fixture_root);
        let output_root = normalize_path(&output_root);
        if fixture_root.starts_with(&output_root) || output_root.starts_with(&fixture_root) {
            return Err(ConfigError::OverlappingScratchDirs {
                fixture: fixture_root,
                output: output_root,
            });
        }

        let timeout = overrides
            .timeout_secs
            .or(self.process.timeout_secs)
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs);

        Ok(HarnessConfig {
            source_root: source_root.to_path_buf(),
            build_command,
            binary: absolutize(source_root, binary),
            test_command,
            modules,
            fixture,
            fixture_root,
            output_root,
            generate_args,
            artifact_path,
            profile: self.tool.profile.clone().unwrap_or_else(|| "release".to_string()),
            check_sentinel: self.fixture.check_sentinel.unwrap_or(true),
            timeout,
            env: self.process.env.clone(),
        })
    }

    fn resolve_modules(
        &self,
        source_root: &Path,
        filter: &[String],
    ) -> Result<Vec<ModuleSpec>, ConfigError> {
        let mut seen = std::collections::BTreeSet::new();
        for entry in &self.modules {
            if !seen.insert(entry.name.as_str()) {
                return Err(ConfigError::DuplicateModule {
                    name: entry.name.clone(),
                });
            }
            if entry.test_command.as_ref().is_some_and(|c| c.is_empty()) {
                return Err(ConfigError::EmptyCommand {
                    field: "modules.test_command",
                });
            }
        }

        for name in filter {
            if !seen.contains(name.as_str()) {
                return Err(ConfigError::UnknownModule {
                    name: name.clone(),
                    available: self.modules.iter().map(|m| m.name.clone()).collect(),
                });
            }
        }

        Ok(self
            .modules
            .iter()
            .filter(|m| filter.is_empty() || filter.contains(&m.name))
            .map(|m| ModuleSpec {
                name: m.name.clone(),
                path: absolutize(source_root, &m.path),
                test_command: m.test_command.clone(),
            })
            .collect())
    }
}

fn merge_opt<T>(slot: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *slot = other;
    }
}

fn non_empty(
    field: &'static str,
    value: Option<Vec<String>>,
    default: &[&str],
) -> Result<Vec<String>, ConfigError> {
    match value {
        Some(command) if command.is_empty() => Err(ConfigError::EmptyCommand { field }),
        Some(command) => Ok(command),
        None => Ok(default.iter().map(|s| s.to_string()).collect()),
    }
}

/// Values from the command line that override the configuration files.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Fixture directory (absolute)
    pub fixture_root: Option<PathBuf>,

    /// Output directory (absolute)
    pub output_root: Option<PathBuf>,

    /// Child process timeout; 0 disables it
    pub timeout_secs: Option<u64>,

    /// Only run these modules' tests
    pub modules: Vec<String>,
}

/// Invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`tool.binary` is not set")]
    MissingBinary,

    #[error("`{field}` must not be an empty command")]
    EmptyCommand { field: &'static str },

    #[error("module `{name}` is listed more than once")]
    DuplicateModule { name: String },

    #[error("unknown module `{name}` (configured: {})", .available.join(", "))]
    UnknownModule { name: String, available: Vec<String> },

    #[error("unknown placeholder `{{{placeholder}}}` in `{field}`")]
    UnknownPlaceholder {
        field: &'static str,
        placeholder: String,
    },

    #[error(
        "fixture directory {} and output directory {} must be separate, not one inside the other",
        .fixture.display(),
        .output.display()
    )]
    OverlappingScratchDirs { fixture: PathBuf, output: PathBuf },
}

/// Fully resolved configuration for one harness run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Root of the tool's source tree
    pub source_root: PathBuf,

    /// Command that rebuilds the tool
    pub build_command: Vec<String>,

    /// Absolute path of the rebuilt tool binary
    pub binary: PathBuf,

    /// Shared module test command
    pub test_command: Vec<String>,

    /// Modules to test, in order
    pub modules: Vec<ModuleSpec>,

    /// Fixture to create
    pub fixture: FixtureSpec,

    /// Where the fixture is created
    pub fixture_root: PathBuf,

    /// Where the tool generates its output
    pub output_root: PathBuf,

    /// Generate invocation arguments (templated)
    pub generate_args: Vec<String>,

    /// Artifact location relative to the output root (templated)
    pub artifact_path: String,

    /// Output profile directory
    pub profile: String,

    /// Require the sentinel on the sample's stdout
    pub check_sentinel: bool,

    /// Per-process timeout
    pub timeout: Option<Duration>,

    /// Extra environment for child processes
    pub env: BTreeMap<String, String>,
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (Shakedown.toml)
/// 2. Global config (~/.shakedown/config.toml)
/// 3. Defaults
///
/// A broken global file is ignored with a warning; a broken project file is
/// an error.
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load(project_path)?);
    }

    Ok(config)
}

/// Get the global shakedown config directory (~/.shakedown).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".shakedown"))
}

/// Get the global config path (~/.shakedown/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Commented template written by `shakedown init`.
pub fn config_template(binary: &str) -> String {
    format!(
        r#"# Shakedown configuration: how to rebuild, unit-test and smoke-test the tool.

[tool]
build_command = ["cargo", "build", "--release"]
binary = "{binary}"
# Placeholders: {{manifest}} {{fixture}} {{output}} {{profile}} {{target}}
generate_args = ["-g", "{{manifest}}"]
artifact_path = "{{profile}}/{{target}}"
profile = "release"

[test]
command = ["cargo", "test"]

# One entry per independently tested module, run in order.
# [[modules]]
# name = "parser"
# path = "parser"

[fixture]
target = "x"
source = "main.cpp"
manifest = "run.mmk"
sentinel = "{sentinel}"
check_sentinel = true

[process]
# timeout_secs = 600
# env = {{ CXX = "g++" }}
"#,
        binary = binary,
        sentinel = DEFAULT_SENTINEL,
    )
}
