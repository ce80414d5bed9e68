//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use shakedown::util::shell::ColorChoice;

/// Shakedown - rebuild, unit-test and smoke-test a build tool
#[derive(Parser)]
#[command(name = "shakedown")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors and the verdict
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the module tests, rebuild the tool and smoke-test it
    Run(RunArgs),

    /// Create the sample project in a new directory
    Fixture(FixtureArgs),

    /// Write a Shakedown.toml template
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Path to the configuration file (defaults to <source root>/Shakedown.toml)
    #[arg(long, value_name = "PATH", env = "SHAKEDOWN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root of the tool's source tree (defaults to the config file's directory)
    #[arg(long, value_name = "DIR")]
    pub source_root: Option<PathBuf>,

    /// Only run the tests of this module (repeatable)
    #[arg(long = "module", value_name = "NAME")]
    pub modules: Vec<String>,

    /// Directory to create the sample project in; must not exist
    #[arg(long, value_name = "DIR")]
    pub fixture_root: Option<PathBuf>,

    /// Directory the tool generates into; must not exist
    #[arg(long, value_name = "DIR")]
    pub output_root: Option<PathBuf>,

    /// Kill any child process still running after this many seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Report format: human, json, github
    #[arg(long, default_value = "human")]
    pub output_format: String,
}

#[derive(Args)]
pub struct FixtureArgs {
    /// Directory to create; must not exist
    pub dir: PathBuf,

    /// Executable target name
    #[arg(long, default_value = "x")]
    pub target: String,

    /// Line the sample program prints
    #[arg(long)]
    pub sentinel: Option<String>,
}

#[derive(Args)]
pub struct InitArgs {
    /// Directory to write Shakedown.toml into (defaults to the current directory)
    pub path: Option<PathBuf>,

    /// Path of the tool binary, relative to the source root
    #[arg(long)]
    pub binary: Option<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
