//! CLI integration tests for Shakedown.
//!
//! These tests drive the binary against a fake build tool living in a
//! temporary source root.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the shakedown binary command.
///
/// HOME points into the sandbox so a developer's global config is ignored.
fn shakedown(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("shakedown").unwrap();
    cmd.env("HOME", home).env("NO_COLOR", "1");
    cmd
}

/// Create a temporary directory for test projects.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

/// A fake tool: `mymake -g <manifest>` writes `release/x`, which prints `output`.
#[cfg(unix)]
fn write_tool(path: &Path, output: &str) {
    use std::os::unix::fs::PermissionsExt;

    let script = format!(
        "#!/bin/sh\n\
         [ \"$1\" = \"-g\" ] && [ -f \"$2\" ] || exit 64\n\
         mkdir -p release\n\
         printf '#!/bin/sh\\necho \"{}\"\\n' > release/x\n\
         chmod +x release/x\n",
        output
    );
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, script).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Lay out a tool source root with one module per `(name, exit code)`.
#[cfg(unix)]
fn project(tmp: &TempDir, modules: &[(&str, i32)]) -> PathBuf {
    let root = tmp.path().join("mymake");
    write_tool(&root.join("bin/mymake"), "Minimum build test successful!");

    let mut config = String::from(
        r#"[tool]
build_command = ["sh", "-c", "touch built"]
binary = "bin/mymake"

[fixture]
root = "../scratch/fixture"
output = "../scratch/output"
"#,
    );
    for (name, code) in modules {
        fs::create_dir_all(root.join(name)).unwrap();
        config.push_str(&format!(
            "\n[[modules]]\nname = \"{name}\"\npath = \"{name}\"\ntest_command = [\"sh\", \"-c\", \"exit {code}\"]\n"
        ));
    }
    fs::write(root.join("Shakedown.toml"), config).unwrap();
    root
}

#[cfg(unix)]
fn scratch(tmp: &TempDir) -> (PathBuf, PathBuf) {
    (
        tmp.path().join("scratch/fixture"),
        tmp.path().join("scratch/output"),
    )
}

// ============================================================================
// shakedown run
// ============================================================================

#[cfg(unix)]
#[test]
fn test_run_succeeds_and_cleans_up() {
    let tmp = temp_dir();
    let root = project(&tmp, &[("mmk_parser", 0), ("generator", 0)]);

    shakedown(tmp.path())
        .arg("run")
        .current_dir(&root)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("[OK]      smoke"))
        .stdout(predicate::str::ends_with("SUCCESS\n"));

    let (fixture, output) = scratch(&tmp);
    assert!(!fixture.exists());
    assert!(!output.exists());
    assert!(!tmp.path().join("scratch").exists());
    assert!(root.join("built").exists());
}

#[cfg(unix)]
#[test]
fn test_module_failure_aborts_with_its_exit_code() {
    let tmp = temp_dir();
    let root = project(&tmp, &[("mmk_parser", 0), ("generator", 3)]);

    shakedown(tmp.path())
        .arg("run")
        .current_dir(&root)
        .assert()
        .code(10)
        .stdout(predicate::str::contains("test suite for module `generator` failed"))
        .stdout(predicate::str::contains("[SKIPPED] rebuild"))
        .stdout(predicate::str::ends_with("FAILURE\n"));

    assert!(!root.join("built").exists());
}

#[cfg(unix)]
#[test]
fn test_module_filter_skips_other_modules() {
    let tmp = temp_dir();
    let root = project(&tmp, &[("mmk_parser", 0), ("generator", 3)]);

    shakedown(tmp.path())
        .args(["run", "--module", "mmk_parser"])
        .current_dir(&root)
        .assert()
        .code(0);
}

#[cfg(unix)]
#[test]
fn test_fixture_collision_preserves_existing_directory() {
    let tmp = temp_dir();
    let root = project(&tmp, &[]);
    let (fixture, _) = scratch(&tmp);
    fs::create_dir_all(&fixture).unwrap();
    fs::write(fixture.join("notes.txt"), "keep me").unwrap();

    shakedown(tmp.path())
        .arg("run")
        .current_dir(&root)
        .assert()
        .code(12)
        .stdout(predicate::str::contains("directory already exists"));

    assert_eq!(fs::read_to_string(fixture.join("notes.txt")).unwrap(), "keep me");
}

#[cfg(unix)]
#[test]
fn test_missing_sentinel_fails() {
    let tmp = temp_dir();
    let root = project(&tmp, &[]);
    write_tool(&root.join("bin/mymake"), "Hello, world");

    shakedown(tmp.path())
        .arg("run")
        .current_dir(&root)
        .assert()
        .code(16)
        .stdout(predicate::str::ends_with("FAILURE\n"));
}

#[cfg(unix)]
#[test]
fn test_run_json_verdict() {
    let tmp = temp_dir();
    let root = project(&tmp, &[("mmk_parser", 0)]);

    let output = shakedown(tmp.path())
        .args(["run", "--output-format", "json"])
        .current_dir(&root)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).unwrap();
    let last = stdout.lines().last().unwrap();
    let verdict: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(verdict["reason"], "verdict");
    assert_eq!(verdict["verdict"], "SUCCESS");
    assert_eq!(verdict["stages"].as_array().unwrap().len(), 4);
    assert!(stdout.contains("\"reason\":\"stage-finished\""));
}

#[cfg(unix)]
#[test]
fn test_run_with_explicit_config_and_roots() {
    let tmp = temp_dir();
    let root = project(&tmp, &[]);
    let fixture = tmp.path().join("elsewhere/fixture");

    shakedown(tmp.path())
        .arg("run")
        .arg("--config")
        .arg(root.join("Shakedown.toml"))
        .arg("--fixture-root")
        .arg(&fixture)
        .current_dir(tmp.path())
        .assert()
        .code(0);

    assert!(!fixture.exists());
}

#[test]
fn test_run_without_config_suggests_init() {
    let tmp = temp_dir();

    shakedown(tmp.path())
        .arg("run")
        .current_dir(tmp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("could not find"))
        .stderr(predicate::str::contains("shakedown init"));
}

#[cfg(unix)]
#[test]
fn test_run_unknown_module_is_a_config_error() {
    let tmp = temp_dir();
    let root = project(&tmp, &[("mmk_parser", 0)]);

    shakedown(tmp.path())
        .args(["run", "--module", "linker"])
        .current_dir(&root)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown module `linker`"));
}

#[test]
fn test_run_rejects_bad_output_format() {
    let tmp = temp_dir();

    shakedown(tmp.path())
        .args(["run", "--output-format", "xml"])
        .current_dir(tmp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid output format"));
}

// ============================================================================
// shakedown init
// ============================================================================

#[test]
fn test_init_writes_config_once() {
    let tmp = temp_dir();

    shakedown(tmp.path())
        .args(["init", "--binary", "build/mymake"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let config = fs::read_to_string(tmp.path().join("Shakedown.toml")).unwrap();
    assert!(config.contains("binary = \"build/mymake\""));
    assert!(config.contains("[fixture]"));

    shakedown(tmp.path())
        .arg("init")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

// ============================================================================
// shakedown fixture
// ============================================================================

#[test]
fn test_fixture_creates_sample_project() {
    let tmp = temp_dir();
    let dir = tmp.path().join("sample");

    shakedown(tmp.path())
        .args(["fixture", "sample"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("main.cpp"))
        .stdout(predicate::str::contains("run.mmk"));

    let manifest = fs::read_to_string(dir.join("run.mmk")).unwrap();
    assert_eq!(manifest, "MMK_EXECUTABLE:\n    x\n\nMMK_SOURCES:\n    main.cpp\n");
    let source = fs::read_to_string(dir.join("main.cpp")).unwrap();
    assert!(source.contains("Minimum build test successful!"));
}

#[test]
fn test_fixture_refuses_existing_directory() {
    let tmp = temp_dir();
    fs::create_dir(tmp.path().join("sample")).unwrap();

    shakedown(tmp.path())
        .args(["fixture", "sample"])
        .current_dir(tmp.path())
        .assert()
        .code(12)
        .stderr(predicate::str::contains("directory already exists"));

    assert!(!tmp.path().join("sample/main.cpp").exists());
}

// ============================================================================
// Misc
// ============================================================================

#[test]
fn test_completions_bash() {
    let tmp = temp_dir();

    shakedown(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shakedown"));
}

#[test]
fn test_help_lists_commands() {
    let tmp = temp_dir();

    shakedown(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("fixture"))
        .stdout(predicate::str::contains("init"));
}
