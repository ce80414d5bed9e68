//! Rebuilding the tool under test from its own source tree.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::HarnessError;
use crate::util::process::{describe_output, ProcessBuilder};

/// Run `build_command` in `source_root` and check that `binary` exists.
///
/// Returns the path of the rebuilt binary.
pub fn rebuild(
    source_root: &Path,
    build_command: &[String],
    binary: &Path,
    env: &BTreeMap<String, String>,
    timeout: Option<Duration>,
) -> Result<PathBuf, HarnessError> {
    let Some(process) = ProcessBuilder::from_argv(build_command) else {
        return Err(HarnessError::RebuildFailure {
            command: String::new(),
            detail: "empty build command".to_string(),
        });
    };
    let process = process.cwd(source_root).envs(env).timeout(timeout);
    let command = process.display_command();

    tracing::debug!("Rebuilding with `{}` in {}", command, source_root.display());

    let output = process.exec().map_err(|e| HarnessError::RebuildFailure {
        command: command.clone(),
        detail: format!("{:#}", e),
    })?;

    if !output.status.success() {
        return Err(HarnessError::RebuildFailure {
            command,
            detail: describe_output(&output),
        });
    }

    if !binary.is_file() {
        return Err(HarnessError::RebuildFailure {
            command,
            detail: format!(
                "the build succeeded but {} does not exist; check `tool.binary`",
                binary.display()
            ),
        });
    }

    Ok(binary.to_path_buf())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::sh;
    use tempfile::TempDir;

    #[test]
    fn test_rebuild_produces_binary() {
        let tmp = TempDir::new().unwrap();
        let binary = tmp.path().join("target/release/mymake");

        let built = rebuild(
            tmp.path(),
            &sh("mkdir -p target/release && touch target/release/mymake"),
            &binary,
            &BTreeMap::new(),
            None,
        )
        .unwrap();

        assert_eq!(built, binary);
    }

    #[test]
    fn test_compile_error_is_rebuild_failure() {
        let tmp = TempDir::new().unwrap();

        let err = rebuild(
            tmp.path(),
            &sh("echo 'error[E0425]: cannot find value `x`' >&2; exit 101"),
            &tmp.path().join("mymake"),
            &BTreeMap::new(),
            None,
        )
        .unwrap_err();

        match err {
            HarnessError::RebuildFailure { command, detail } => {
                assert!(command.starts_with("sh -c"));
                assert!(detail.contains("exit code 101"));
                assert!(detail.contains("error[E0425]"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_binary_is_rebuild_failure() {
        let tmp = TempDir::new().unwrap();

        let err = rebuild(
            tmp.path(),
            &sh("true"),
            &tmp.path().join("target/release/mymake"),
            &BTreeMap::new(),
            None,
        )
        .unwrap_err();

        assert_eq!(err.exit_code(), 11);
        assert!(err.detail().unwrap().contains("does not exist"));
    }

    #[test]
    fn test_unknown_build_program() {
        let tmp = TempDir::new().unwrap();
        let command = vec!["shakedown-no-such-compiler".to_string()];

        let err = rebuild(tmp.path(), &command, &tmp.path().join("x"), &BTreeMap::new(), None)
            .unwrap_err();

        assert!(err.detail().unwrap().contains("not found in PATH"));
    }
}
