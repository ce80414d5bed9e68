//! Throwaway source roots for harness tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::core::fixture::FixtureSpec;
use crate::core::module::ModuleSpec;
use crate::util::config::HarnessConfig;

use super::{sh, FakeTool, ARTIFACT_MARKER};

/// A temporary source root plus fixture and output locations.
///
/// Nothing exists at the fixture and output paths until a run creates them.
#[derive(Debug)]
pub struct Sandbox {
    pub tmp: TempDir,
    pub source_root: PathBuf,
    pub fixture_root: PathBuf,
    pub output_root: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let source_root = tmp.path().join("tool");
        fs::create_dir(&source_root).unwrap();

        Sandbox {
            fixture_root: tmp.path().join("scratch/fixture"),
            output_root: tmp.path().join("scratch/output"),
            source_root,
            tmp,
        }
    }

    /// The directory holding both scratch roots; created by the run.
    pub fn scratch_parent(&self) -> PathBuf {
        self.tmp.path().join("scratch")
    }

    /// A config that "rebuilds" by touching `built` and drives `tool`.
    pub fn config(&self, tool: FakeTool) -> HarnessConfig {
        let binary = tool.install(&self.source_root.join("bin"));

        HarnessConfig {
            source_root: self.source_root.clone(),
            build_command: sh("touch built"),
            binary,
            test_command: sh("exit 0"),
            modules: Vec::new(),
            fixture: FixtureSpec::default(),
            fixture_root: self.fixture_root.clone(),
            output_root: self.output_root.clone(),
            generate_args: vec!["-g".to_string(), "{manifest}".to_string()],
            artifact_path: "{profile}/{target}".to_string(),
            profile: "release".to_string(),
            check_sentinel: true,
            timeout: None,
            env: BTreeMap::new(),
        }
    }

    /// Create a module directory whose tests run `script`.
    pub fn module(&self, name: &str, script: &str) -> ModuleSpec {
        let path = self.source_root.join(name);
        fs::create_dir_all(&path).unwrap();
        ModuleSpec::new(name, path).with_test_command(sh(script))
    }

    /// Whether the rebuild stage ran.
    pub fn was_rebuilt(&self) -> bool {
        self.source_root.join("built").exists()
    }

    /// Whether a sample artifact was executed.
    pub fn artifact_ran(&self) -> bool {
        self.source_root.join("bin").join(ARTIFACT_MARKER).exists()
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Sandbox::new()
    }
}
