//! Subprocess execution for the external tools

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use apirun_security::{ContentRedactor, Redactor};
use lazy_static::lazy_static;
use tokio::process::Command;

lazy_static! {
    static ref SCRUBBER: Redactor = Redactor::new();
}

/// A command line plus the environment it needs.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Added to the inherited environment. Values are never logged.
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Command line with credentials masked, for logs and error messages
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        scrub(&line)
    }
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Last lines of stderr (or stdout when stderr is empty), masked
    pub fn tail(&self, lines: usize) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let all: Vec<&str> = source.lines().collect();
        let start = all.len().saturating_sub(lines);
        scrub(all[start..].join("\n").trim())
    }
}

/// Run to completion. There is no timeout; the call blocks until the tool
/// exits. Only a spawn or wait failure is an `Err`.
pub async fn run_command(spec: &CommandSpec) -> std::io::Result<CommandOutput> {
    let start = Instant::now();
    tracing::debug!("Running {}", spec.display());

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &spec.cwd {
        command.current_dir(dir);
    }

    let output = command.spawn()?.wait_with_output().await?;

    let result = CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    tracing::debug!(
        "{} exited with {} after {}ms",
        spec.program,
        result.exit_code,
        result.duration_ms
    );
    Ok(result)
}

/// Mask anything secret-shaped in tool output before it reaches a log line.
pub fn scrub(text: &str) -> String {
    SCRUBBER.redact("process-output", text).0
}
