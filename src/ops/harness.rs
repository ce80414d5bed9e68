//! The harness controller.
//!
//! A run executes a fixed list of stages in order:
//!
//! 1. `modules` - each module's own test suite
//! 2. `rebuild` - rebuild the tool from source
//! 3. `fixture` - create the sample project
//! 4. `smoke` - generate, compile and run the sample with the rebuilt tool
//!
//! The first failing stage aborts the run; later stages stay pending. Every
//! directory the run created is removed afterwards, whatever the outcome.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::core::error::HarnessError;
use crate::core::fixture::{populate_fixture, Fixture};
use crate::core::module::ModuleResult;
use crate::core::stage::StageReport;
use crate::core::verdict::Verdict;
use crate::ops::module_tests::run_module_tests;
use crate::ops::rebuild::rebuild;
use crate::ops::scratch::Scratch;
use crate::ops::smoke::{run_smoke_test, SmokeOptions};
use crate::util::config::HarnessConfig;
use crate::util::shell::{format_duration, Shell, Status};

/// State shared by the stages of one run.
pub struct RunContext<'a> {
    pub config: &'a HarnessConfig,
    pub shell: &'a Arc<Shell>,
    pub scratch: &'a mut Scratch,

    /// Module results so far, in execution order
    pub modules: Vec<ModuleResult>,

    /// The rebuilt tool, once the rebuild stage has run
    pub binary: Option<PathBuf>,

    /// The sample project, once the fixture stage has run
    pub fixture: Option<Fixture>,
}

/// One step of a harness run.
pub trait Stage {
    /// Unique stage name.
    fn name(&self) -> &'static str;

    /// Whether a failure stops the run. Every built-in stage does.
    fn abort_on_failure(&self) -> bool {
        true
    }

    /// Execute the stage, returning a one-line summary.
    fn run(&self, ctx: &mut RunContext<'_>) -> Result<String, HarnessError>;
}

/// Runs every configured module's test suite, stopping at the first failure.
pub struct ModuleTestsStage;

impl Stage for ModuleTestsStage {
    fn name(&self) -> &'static str {
        "modules"
    }

    fn run(&self, ctx: &mut RunContext<'_>) -> Result<String, HarnessError> {
        let config = ctx.config;
        let modules = &config.modules;
        if modules.is_empty() {
            return Ok("no modules configured".to_string());
        }

        let mut progress = ctx.shell.progress(modules.len() as u64, "module tests");
        for module in modules {
            progress.set_message(&module.name);
            progress.println(
                Status::Testing,
                format!("{} ({})", module.name, module.path.display()),
            );

            let result =
                run_module_tests(module, &config.test_command, &config.env, config.timeout);
            progress.inc(1);

            let failure = (!result.success).then(|| HarnessError::ModuleTestFailure {
                module: module.name.clone(),
                detail: result.diagnostic.clone().unwrap_or_default(),
            });
            ctx.modules.push(result);

            if let Some(err) = failure {
                progress.println(Status::Failed, &module.name);
                return Err(err);
            }
        }
        progress.finish();

        Ok(format!("{} module test suite(s) passed", modules.len()))
    }
}

/// Rebuilds the tool under test.
pub struct RebuildStage;

impl Stage for RebuildStage {
    fn name(&self) -> &'static str {
        "rebuild"
    }

    fn run(&self, ctx: &mut RunContext<'_>) -> Result<String, HarnessError> {
        let config = ctx.config;
        ctx.shell.status(
            Status::Building,
            format!("{} ({})", config.build_command.join(" "), config.source_root.display()),
        );

        let binary = rebuild(
            &config.source_root,
            &config.build_command,
            &config.binary,
            &config.env,
            config.timeout,
        )?;
        let summary = format!("built {}", binary.display());
        ctx.binary = Some(binary);
        Ok(summary)
    }
}

/// Creates the sample project in a directory owned by the run.
pub struct FixtureStage;

impl Stage for FixtureStage {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn run(&self, ctx: &mut RunContext<'_>) -> Result<String, HarnessError> {
        let root = ctx.scratch.acquire_dir(&ctx.config.fixture_root)?;
        ctx.shell.status(Status::Creating, format!("fixture in {}", root.display()));

        let fixture = populate_fixture(&root, &ctx.config.fixture)?;
        let summary = format!(
            "created {} and {}",
            fixture.source.display(),
            fixture.manifest.display()
        );
        ctx.fixture = Some(fixture);
        Ok(summary)
    }
}

/// Drives the rebuilt tool against the fixture.
pub struct SmokeStage;

impl Stage for SmokeStage {
    fn name(&self) -> &'static str {
        "smoke"
    }

    fn run(&self, ctx: &mut RunContext<'_>) -> Result<String, HarnessError> {
        let fixture = ctx.fixture.clone().ok_or_else(|| {
            HarnessError::io(
                "no fixture to smoke-test",
                io::Error::new(io::ErrorKind::NotFound, "the fixture stage did not run"),
            )
        })?;
        let tool = ctx.binary.clone().unwrap_or_else(|| ctx.config.binary.clone());
        let output_dir = ctx.scratch.acquire_dir(&ctx.config.output_root)?;

        let report = run_smoke_test(
            &tool,
            &fixture,
            &output_dir,
            &SmokeOptions::from_config(ctx.config),
            ctx.shell,
        )?;

        Ok(format!("{} ran successfully", report.artifact.display()))
    }
}

/// The standard stage list, in execution order.
pub fn default_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(ModuleTestsStage),
        Box::new(RebuildStage),
        Box::new(FixtureStage),
        Box::new(SmokeStage),
    ]
}

/// Sequences the stages of a run and produces the verdict.
pub struct Harness {
    config: HarnessConfig,
    shell: Arc<Shell>,
    stages: Vec<Box<dyn Stage>>,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Harness::with_stages(config, default_stages())
    }

    /// A harness running a custom stage list.
    pub fn with_stages(config: HarnessConfig, stages: Vec<Box<dyn Stage>>) -> Self {
        Harness {
            config,
            shell: Arc::new(Shell::quiet()),
            stages,
        }
    }

    /// Report progress through `shell` instead of staying quiet.
    pub fn with_shell(mut self, shell: Arc<Shell>) -> Self {
        self.shell = shell;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Execute the stages in order and clean up.
    ///
    /// Never returns an error: every failure, including a panicking stage,
    /// is recorded in the verdict.
    pub fn run(&self) -> Verdict {
        let start = Instant::now();
        let mut scratch = Scratch::new();
        let mut reports: Vec<StageReport> = self
            .stages
            .iter()
            .enumerate()
            .map(|(ordinal, stage)| StageReport::pending(stage.name(), ordinal))
            .collect();
        let mut failure: Option<(String, HarnessError)> = None;

        let modules = {
            let mut ctx = RunContext {
                config: &self.config,
                shell: &self.shell,
                scratch: &mut scratch,
                modules: Vec::new(),
                binary: None,
                fixture: None,
            };

            for (stage, report) in self.stages.iter().zip(reports.iter_mut()) {
                tracing::debug!("Starting stage `{}`", stage.name());
                report.start();
                let stage_start = Instant::now();

                let outcome = panic::catch_unwind(AssertUnwindSafe(|| stage.run(&mut ctx)))
                    .unwrap_or_else(|payload| {
                        Err(HarnessError::StagePanicked {
                            stage: stage.name().to_string(),
                            message: panic_message(payload.as_ref()),
                        })
                    });

                let elapsed = stage_start.elapsed();
                match outcome {
                    Ok(summary) => {
                        self.shell.status(
                            Status::Passed,
                            format!("{}: {} [{}]", stage.name(), summary, format_duration(elapsed)),
                        );
                        report.succeed(summary, elapsed);
                    }
                    Err(err) => {
                        self.shell.status(Status::Failed, format!("{}: {}", stage.name(), err));
                        report.fail(&err, elapsed);
                        self.emit_stage_event(report);

                        if stage.abort_on_failure() {
                            failure = Some((stage.name().to_string(), err));
                            break;
                        }
                        if failure.is_none() {
                            failure = Some((stage.name().to_string(), err));
                        }
                        continue;
                    }
                }
                self.emit_stage_event(report);
            }

            ctx.modules
        };

        let cleanup_warnings = self.cleanup(scratch);

        Verdict::new(
            reports,
            modules,
            failure.as_ref().map(|(stage, err)| (stage.as_str(), err)),
            cleanup_warnings,
            start.elapsed(),
        )
    }

    fn cleanup(&self, scratch: Scratch) -> Vec<String> {
        for dir in scratch.owned() {
            self.shell.verbose(Status::Cleaning, dir.display());
        }

        let warnings = scratch.release();
        for warning in &warnings {
            self.shell.warn(warning);
        }
        warnings
    }

    fn emit_stage_event(&self, report: &StageReport) {
        if self.shell.is_json() {
            self.shell.json_event(&serde_json::json!({
                "reason": "stage-finished",
                "stage": report,
            }));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
