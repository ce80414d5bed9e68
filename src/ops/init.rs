//! Implementation of `shakedown init`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::util::config::{config_template, CONFIG_FILE_NAME};

/// Options for writing a new configuration file.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Path of the tool binary, relative to the source root
    pub binary: Option<String>,
}

/// Write a commented `Shakedown.toml` into `dir`.
///
/// The binary defaults to `target/release/<directory name>`. An existing
/// configuration file is never overwritten.
pub fn init_config(dir: &Path, opts: &InitOptions) -> Result<PathBuf> {
    if !dir.is_dir() {
        bail!("`{}` is not a directory", dir.display());
    }

    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        bail!("`{}` already exists in `{}`", CONFIG_FILE_NAME, dir.display());
    }

    let binary = opts
        .binary
        .clone()
        .unwrap_or_else(|| format!("target/release/{}", default_binary_name(dir)));

    std::fs::write(&config_path, config_template(&binary))
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    Ok(config_path)
}

fn default_binary_name(dir: &Path) -> String {
    dir.canonicalize()
        .ok()
        .as_deref()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("tool")
        .to_string()
}
