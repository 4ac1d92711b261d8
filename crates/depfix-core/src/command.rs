//! External package-manager invocations.
//!
//! Editors never spawn processes directly. They describe an [`Invocation`]
//! and hand it to a [`CommandRunner`], which lets tests record the calls
//! instead of running `npm`, `go` or `mvn`.

use crate::error::{FixError, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Directory the command runs in. Never the process working directory
    /// implicitly.
    pub working_dir: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Command line as shown in logs and errors.
    pub fn command_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Boundary between editors and the package-manager executables.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the invocation to completion and captures its output.
    ///
    /// Only a failure to start the process is an error here; a non-zero exit
    /// is reported through [`CommandOutput::status`].
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;

    /// Runs the invocation and turns a non-zero exit into
    /// [`FixError::ExternalToolError`].
    async fn run_checked(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let output = self.run(invocation).await?;
        if output.is_success() {
            return Ok(output);
        }
        tracing::warn!(
            command = %invocation,
            status = ?output.status,
            stderr = %output.stderr.trim(),
            "external command failed"
        );
        Err(FixError::ExternalToolError {
            command: invocation.command_line(),
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Runner shared between the editors of one run.
pub type SharedRunner = Arc<dyn CommandRunner>;

/// Runs invocations as child processes through tokio.
///
/// Waits without a timeout; the package manager decides how long resolution
/// takes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        tracing::info!(
            command = %invocation,
            dir = %invocation.working_dir.display(),
            "running external command"
        );

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .output()
            .await
            .map_err(|e| FixError::ExternalToolError {
                command: invocation.command_line(),
                status: None,
                stdout: String::new(),
                stderr: e.to_string(),
            })?;

        let result = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        tracing::debug!(
            command = %invocation,
            status = ?result.status,
            "external command finished"
        );

        Ok(result)
    }
}

/// Builds the package argument(s) for a package-manager command.
///
/// The name, operator and version are concatenated and then split on
/// whitespace, so a spaced operator yields separate arguments.
///
/// # Examples
///
/// ```
/// use depfix_core::command::fixed_package_args;
///
/// assert_eq!(fixed_package_args("snappier", " -v ", "1.1.1"), vec!["snappier", "-v", "1.1.1"]);
/// assert_eq!(fixed_package_args("json", "@", "10.0.0"), vec!["json@10.0.0"]);
/// ```
pub fn fixed_package_args(name: &str, operator: &str, version: &str) -> Vec<String> {
    format!("{name}{operator}{version}")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
