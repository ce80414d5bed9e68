//! Subprocess execution utilities.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use thiserror::Error;

/// How often a child with a deadline is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Number of trailing lines of each stream kept by [`describe_output`].
const OUTPUT_TAIL_LINES: usize = 40;

/// A child process exceeded its deadline and was killed.
#[derive(Debug, Error)]
#[error("`{command}` timed out after {}s and was killed", .after.as_secs_f64())]
pub struct TimedOut {
    pub command: String,
    pub after: Duration,
}

/// Builder for subprocess execution.
///
/// The working directory is always passed to the child explicitly; the
/// current process's directory is never changed.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
            timeout: None,
        }
    }

    /// Create a builder from an argv-style command line.
    ///
    /// Returns `None` for an empty command.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(ProcessBuilder::new(program).args(args))
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set several environment variables.
    pub fn envs<'a, I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (key, value) in vars {
            self.env.insert(key.clone(), value.clone());
        }
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Kill the child if it has not exited after `timeout`.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the Command.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command and wait for completion.
    ///
    /// Exceeding the configured timeout yields a [`TimedOut`] error. On unix
    /// a child with a timeout runs in its own process group, and the whole
    /// group is killed, so grandchildren (`rustc` under `cargo`) go with it.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            if self.timeout.is_some() {
                cmd.process_group(0);
            }
        }

        tracing::debug!("Running `{}`", self.display_command());

        let mut child = cmd.spawn().with_context(|| self.spawn_failure())?;

        let Some(timeout) = self.timeout else {
            return child
                .wait_with_output()
                .with_context(|| format!("failed to wait for `{}`", self.program.display()));
        };

        // Drain both pipes while polling so a chatty child cannot block on a full pipe.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        let deadline = Instant::now() + timeout;

        let status = loop {
            let polled = child
                .try_wait()
                .with_context(|| format!("failed to wait for `{}`", self.program.display()))?;
            if let Some(status) = polled {
                break status;
            }
            if Instant::now() >= deadline {
                if let Err(e) = kill_process_tree(&mut child) {
                    tracing::warn!("failed to kill `{}`: {}", self.program.display(), e);
                }
                let _ = child.wait();
                return Err(TimedOut {
                    command: self.display_command(),
                    after: timeout,
                }
                .into());
            }
            thread::sleep(POLL_INTERVAL);
        };

        Ok(Output {
            status,
            stdout: stdout.map(join_drained).unwrap_or_default(),
            stderr: stderr.map(join_drained).unwrap_or_default(),
        })
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    fn spawn_failure(&self) -> String {
        let program = self.program.to_string_lossy();
        let is_bare_name = self.program.components().count() == 1;
        if is_bare_name && find_executable(&program).is_none() {
            format!("failed to spawn `{}`: `{}` not found in PATH", self.display_command(), program)
        } else {
            format!("failed to spawn `{}`", self.display_command())
        }
    }
}

/// Kill a child spawned as the leader of its own process group.
#[cfg(unix)]
fn kill_process_tree(child: &mut Child) -> std::io::Result<()> {
    if let Ok(pid) = i32::try_from(child.id()) {
        // SAFETY: plain signal delivery; the group id is the child's own pid.
        if unsafe { libc::kill(-pid, libc::SIGKILL) } == 0 {
            return Ok(());
        }
    }
    child.kill()
}

#[cfg(not(unix))]
fn kill_process_tree(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn join_drained(handle: JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Summarize a finished process for diagnostics.
///
/// Only the last lines of each stream are kept.
pub fn describe_output(output: &Output) -> String {
    let mut text = match output.status.code() {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    };

    for (label, bytes) in [("stdout", &output.stdout), ("stderr", &output.stderr)] {
        let stream = String::from_utf8_lossy(bytes);
        let stream = stream.trim_end();
        if stream.is_empty() {
            continue;
        }
        text.push_str(&format!("\n--- {} ---\n{}", label, tail_lines(stream, OUTPUT_TAIL_LINES)));
    }

    text
}

fn tail_lines(text: &str, limit: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= limit {
        return lines.join("\n");
    }
    let skipped = lines.len() - limit;
    format!("... ({} lines omitted)\n{}", skipped, lines[skipped..].join("\n"))
}
