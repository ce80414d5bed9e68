//! The disposable sample project used by the smoke test.
//!
//! A fixture is exactly two files under a directory that did not exist
//! before: a C++ source file that prints a sentinel line, and a
//! project-description file naming one executable target built from it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::error::HarnessError;
use crate::util::fs::create_fresh_dir;

/// Line printed by the sample executable on success.
pub const DEFAULT_SENTINEL: &str = "Minimum build test successful!";

/// Shape of the fixture to materialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureSpec {
    /// Executable target declared in the project description
    pub target: String,
    /// Source file name, relative to the fixture root
    pub source_name: String,
    /// Project-description file name
    pub manifest_name: String,
    /// Text the sample program prints
    pub sentinel: String,
}

impl Default for FixtureSpec {
    fn default() -> Self {
        FixtureSpec {
            target: "x".to_string(),
            source_name: "main.cpp".to_string(),
            manifest_name: "run.mmk".to_string(),
            sentinel: DEFAULT_SENTINEL.to_string(),
        }
    }
}

/// A materialized fixture.
///
/// The root directory is owned by the run that created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub root: PathBuf,
    pub source: PathBuf,
    pub manifest: PathBuf,
    pub target: String,
    pub sentinel: String,
}

/// Create a fresh fixture at `root`.
///
/// Fails with [`HarnessError::FixtureCollision`] if `root` already exists,
/// in which case nothing on disk is modified.
pub fn create_fixture(root: &Path, spec: &FixtureSpec) -> Result<Fixture, HarnessError> {
    create_fresh_dir(root).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists => HarnessError::FixtureCollision {
            path: root.to_path_buf(),
        },
        _ => HarnessError::io(
            format!("failed to create fixture directory {}", root.display()),
            e,
        ),
    })?;

    populate_fixture(root, spec)
}

/// Write the fixture files into `root`, an existing empty directory.
///
/// Used when the caller has already created (and owns) the directory.
pub fn populate_fixture(root: &Path, spec: &FixtureSpec) -> Result<Fixture, HarnessError> {
    let source = root.join(&spec.source_name);
    fs::write(&source, render_source(&spec.sentinel)).map_err(|e| {
        HarnessError::io(format!("failed to write fixture source {}", source.display()), e)
    })?;

    let manifest = root.join(&spec.manifest_name);
    fs::write(&manifest, render_manifest(&spec.target, &[spec.source_name.as_str()])).map_err(
        |e| {
            HarnessError::io(
                format!("failed to write project description {}", manifest.display()),
                e,
            )
        },
    )?;

    tracing::debug!("Created fixture in {}", root.display());

    Ok(Fixture {
        root: root.to_path_buf(),
        source,
        manifest,
        target: spec.target.clone(),
        sentinel: spec.sentinel.clone(),
    })
}

/// Source of the sample program.
pub fn render_source(sentinel: &str) -> String {
    format!(
        r#"#include <iostream>

int main()
{{
    std::cout << "{sentinel}" << std::endl;
    return 0;
}}
"#,
        sentinel = escape_cpp_string(sentinel)
    )
}

/// Project description: one executable block, one sources block.
pub fn render_manifest(target: &str, sources: &[&str]) -> String {
    let mut content = format!("MMK_EXECUTABLE:\n    {}\n\nMMK_SOURCES:\n", target);
    for source in sources {
        content.push_str(&format!("    {}\n", source));
    }
    content
}

fn escape_cpp_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_fixture_writes_two_files() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fixture");

        let fixture = create_fixture(&root, &FixtureSpec::default()).unwrap();

        assert_eq!(fixture.root, root);
        assert_eq!(fixture.target, "x");
        let entries: Vec<_> = fs::read_dir(&root).unwrap().collect();
        assert_eq!(entries.len(), 2);

        let source = fs::read_to_string(&fixture.source).unwrap();
        assert!(source.contains("\"Minimum build test successful!\""));
        assert!(source.contains("return 0;"));

        let manifest = fs::read_to_string(&fixture.manifest).unwrap();
        assert_eq!(manifest, "MMK_EXECUTABLE:\n    x\n\nMMK_SOURCES:\n    main.cpp\n");
    }

    #[test]
    fn test_create_fixture_collision_leaves_directory_intact() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("fixture");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("leftover.txt"), "from a crashed run").unwrap();

        let err = create_fixture(&root, &FixtureSpec::default()).unwrap_err();

        assert!(matches!(err, HarnessError::FixtureCollision { ref path } if path == &root));
        assert_eq!(
            fs::read_to_string(root.join("leftover.txt")).unwrap(),
            "from a crashed run"
        );
        assert!(!root.join("main.cpp").exists());
        assert!(!root.join("run.mmk").exists());
    }

    #[test]
    fn test_create_fixture_creates_missing_parents() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("nested/deeper/fixture");

        let fixture = create_fixture(&root, &FixtureSpec::default()).unwrap();
        assert!(fixture.manifest.is_file());
    }

    #[test]
    fn test_render_source_escapes_sentinel() {
        let source = render_source(r#"say "hi" \o/"#);
        assert!(source.contains(r#"std::cout << "say \"hi\" \\o/" << std::endl;"#));
    }

    #[test]
    fn test_render_manifest_lists_sources() {
        let manifest = render_manifest("app", &["main.cpp", "util.cpp"]);
        assert!(manifest.starts_with("MMK_EXECUTABLE:\n    app\n"));
        assert!(manifest.ends_with("MMK_SOURCES:\n    main.cpp\n    util.cpp\n"));
    }
}
