//! Running the self-test suite of one module of the tool under test.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::core::module::{ModuleResult, ModuleSpec};
use crate::util::process::{describe_output, ProcessBuilder};

/// Run `module`'s test suite in its own directory.
///
/// The module's own command is used if it has one, else `shared_command`.
/// Every way of not passing (non-zero exit, spawn failure, timeout, missing
/// directory) comes back as a failed [`ModuleResult`] carrying the reason.
pub fn run_module_tests(
    module: &ModuleSpec,
    shared_command: &[String],
    env: &BTreeMap<String, String>,
    timeout: Option<Duration>,
) -> ModuleResult {
    let start = Instant::now();
    let command = module.effective_command(shared_command);

    let Some(process) = ProcessBuilder::from_argv(command) else {
        return ModuleResult::failed(module, None, "empty test command", start.elapsed());
    };

    if !module.path.is_dir() {
        return ModuleResult::failed(
            module,
            None,
            format!("module directory {} does not exist", module.path.display()),
            start.elapsed(),
        );
    }

    let process = process.cwd(&module.path).envs(env).timeout(timeout);
    tracing::debug!(
        "Testing module `{}` with `{}` in {}",
        module.name,
        process.display_command(),
        module.path.display()
    );

    match process.exec() {
        Ok(output) if output.status.success() => ModuleResult::passed(module, start.elapsed()),
        Ok(output) => ModuleResult::failed(
            module,
            output.status.code(),
            describe_output(&output),
            start.elapsed(),
        ),
        Err(e) => ModuleResult::failed(module, None, format!("{:#}", e), start.elapsed()),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::{sh, Sandbox};

    #[test]
    fn test_passing_module() {
        let sandbox = Sandbox::new();
        let module = sandbox.module("parser", "exit 0");

        let result = run_module_tests(&module, &[], &BTreeMap::new(), None);

        assert!(result.success);
        assert_eq!(result.module, "parser");
        assert!(result.diagnostic.is_none());
    }

    #[test]
    fn test_failing_module_keeps_output() {
        let sandbox = Sandbox::new();
        let module = sandbox.module("generator", "echo 'test generates_makefile ... FAILED'; exit 3");

        let result = run_module_tests(&module, &[], &BTreeMap::new(), None);

        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
        let diagnostic = result.diagnostic.unwrap();
        assert!(diagnostic.contains("exit code 3"));
        assert!(diagnostic.contains("generates_makefile ... FAILED"));
    }

    #[test]
    fn test_runs_in_module_directory_with_env() {
        let sandbox = Sandbox::new();
        let module = ModuleSpec::new("resolver", sandbox.source_root.join("resolver"));
        std::fs::create_dir(&module.path).unwrap();
        let mut env = BTreeMap::new();
        env.insert("CXX".to_string(), "g++".to_string());

        let before = std::env::current_dir().unwrap();
        let shared = sh("[ \"$(basename \"$PWD\")\" = resolver ] && [ \"$CXX\" = g++ ]");
        let result = run_module_tests(&module, &shared, &env, None);

        assert!(result.success, "{:?}", result.diagnostic);
        assert_eq!(std::env::current_dir().unwrap(), before);
    }

    #[test]
    fn test_missing_directory_fails_without_spawning() {
        let module = ModuleSpec::new("ghost", "/nonexistent/shakedown/ghost");

        let result = run_module_tests(&module, &sh("exit 0"), &BTreeMap::new(), None);

        assert!(!result.success);
        assert!(result.diagnostic.unwrap().contains("does not exist"));
    }

    #[test]
    fn test_timeout_fails_module() {
        let sandbox = Sandbox::new();
        let module = sandbox.module("slow", "exec sleep 5");

        let result = run_module_tests(
            &module,
            &[],
            &BTreeMap::new(),
            Some(Duration::from_millis(200)),
        );

        assert!(!result.success);
        assert!(result.diagnostic.unwrap().contains("timed out"));
        assert!(result.duration < Duration::from_secs(5));
    }
}
