//! Report formatting for verdicts (human/JSON/GitHub).

use std::fmt::{self, Write as _};

use crate::core::stage::StageState;
use crate::core::verdict::Verdict;
use crate::util::shell::format_duration;

/// Report format for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// One machine-readable JSON line
    Json,
    /// GitHub Actions annotations with job summary
    Github,
}

impl std::str::FromStr for OutputFormat {
    type Err = OutputFormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            "github" | "github-actions" | "gha" => Ok(OutputFormat::Github),
            _ => Err(OutputFormatParseError(s.to_string())),
        }
    }
}

/// Error parsing output format option.
#[derive(Debug, Clone)]
pub struct OutputFormatParseError(pub String);

impl fmt::Display for OutputFormatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid output format '{}', valid values: human, json, github",
            self.0
        )
    }
}

impl std::error::Error for OutputFormatParseError {}

/// Format the verdict according to the specified output format.
pub fn format_verdict(verdict: &Verdict, format: OutputFormat, verbose: bool) -> String {
    let mut output = String::new();
    // Writing into a String cannot fail.
    let _ = match format {
        OutputFormat::Human => write_human(&mut output, verdict, verbose),
        OutputFormat::Json => write_json(&mut output, verdict),
        OutputFormat::Github => write_github(&mut output, verdict),
    };
    output
}

fn stage_tag(state: StageState) -> &'static str {
    match state {
        StageState::Succeeded => "[OK]",
        StageState::Failed => "[FAIL]",
        StageState::Pending => "[SKIPPED]",
        StageState::Running => "[RUNNING]",
    }
}

fn write_human(out: &mut String, verdict: &Verdict, verbose: bool) -> fmt::Result {
    writeln!(out, "Shakedown: {} stages", verdict.stages.len())?;
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out)?;

    for stage in &verdict.stages {
        match stage.state {
            StageState::Pending => writeln!(out, "  {:<9} {}", stage_tag(stage.state), stage.name)?,
            _ => writeln!(
                out,
                "  {:<9} {} ({})",
                stage_tag(stage.state),
                stage.name,
                format_duration(stage.duration)
            )?,
        }

        if verbose || stage.state == StageState::Failed {
            writeln!(out, "      {}", stage.message)?;
        }
        if let Some(detail) = &stage.detail {
            for line in detail.lines() {
                writeln!(out, "      {}", line)?;
            }
        }
    }

    if !verdict.modules.is_empty() {
        writeln!(out, "\nModules:")?;
        for module in &verdict.modules {
            let tag = if module.success { "[OK]" } else { "[FAIL]" };
            writeln!(
                out,
                "  {:<6} {} ({})",
                tag,
                module.module,
                format_duration(module.duration)
            )?;
        }
    }

    if !verdict.cleanup_warnings.is_empty() {
        writeln!(out, "\nCleanup warnings:")?;
        for warning in &verdict.cleanup_warnings {
            writeln!(out, "  - {}", warning)?;
        }
    }

    writeln!(out)?;
    match &verdict.failure {
        None => writeln!(
            out,
            "Result: {}/{} stages passed",
            verdict.succeeded_count(),
            verdict.stages.len()
        )?,
        Some(failure) => writeln!(
            out,
            "Result: {}/{} stages passed; `{}` failed with {} (exit code {})",
            verdict.succeeded_count(),
            verdict.stages.len(),
            failure.stage,
            failure.kind,
            verdict.exit_code
        )?,
    }
    writeln!(out, "Total time: {}", format_duration(verdict.total_duration))?;
    writeln!(out, "{}", verdict.label())
}

fn write_json(out: &mut String, verdict: &Verdict) -> fmt::Result {
    let mut value = serde_json::to_value(verdict).unwrap_or_else(|e| {
        serde_json::json!({ "error": format!("failed to serialize verdict: {}", e) })
    });
    if let Some(object) = value.as_object_mut() {
        object.insert("reason".to_string(), "verdict".into());
        object.insert("verdict".to_string(), verdict.label().into());
    }
    writeln!(out, "{}", value)
}

/// Escape a message for a workflow command (`%`, CR and LF).
fn escape_annotation(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "")
        .replace('\n', "%0A")
}

fn write_github(out: &mut String, verdict: &Verdict) -> fmt::Result {
    if let Some(failure) = &verdict.failure {
        let mut message = failure.message.clone();
        if let Some(detail) = &failure.detail {
            message.push('\n');
            message.push_str(detail);
        }
        writeln!(
            out,
            "::error title=shakedown {} ({})::{}",
            failure.stage,
            failure.kind,
            escape_annotation(&message)
        )?;
    }
    for warning in &verdict.cleanup_warnings {
        writeln!(out, "::warning title=shakedown cleanup::{}", escape_annotation(warning))?;
    }

    writeln!(out, "::group::Shakedown Summary")?;
    writeln!(out)?;
    writeln!(out, "| Stage | Status | Duration |")?;
    writeln!(out, "|-------|--------|----------|")?;
    for stage in &verdict.stages {
        let status = match stage.state {
            StageState::Succeeded => ":white_check_mark:",
            StageState::Failed => ":x:",
            StageState::Pending | StageState::Running => ":heavy_minus_sign:",
        };
        writeln!(
            out,
            "| {} | {} | {} |",
            stage.name,
            status,
            format_duration(stage.duration)
        )?;
    }
    writeln!(out)?;

    if !verdict.modules.is_empty() {
        writeln!(out, "### Modules")?;
        for module in &verdict.modules {
            let status = if module.success { ":white_check_mark:" } else { ":x:" };
            writeln!(out, "- {} `{}`", status, module.module)?;
        }
        writeln!(out)?;
    }

    if let Some(detail) = verdict.failure.as_ref().and_then(|f| f.detail.as_ref()) {
        writeln!(out, "<details>")?;
        writeln!(out, "<summary>Failure output</summary>")?;
        writeln!(out)?;
        writeln!(out, "```")?;
        writeln!(out, "{}", detail)?;
        writeln!(out, "```")?;
        writeln!(out, "</details>")?;
        writeln!(out)?;
    }

    writeln!(
        out,
        "**Result:** {} ({}/{} stages passed, exit code {})",
        verdict.label(),
        verdict.succeeded_count(),
        verdict.stages.len(),
        verdict.exit_code
    )?;
    writeln!(out, "::endgroup::")?;
    writeln!(out, "{}", verdict.label())
}
