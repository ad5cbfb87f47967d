//! # Command Runner
//!
//! The archive never speaks the artifact store's protocol itself; it shells
//! out to the `artifacts` and `lkg` tools. [`CommandRunner`] is the seam:
//! production code uses [`ProcessRunner`], tests use
//! [`ScriptedRunner`](crate::testing::ScriptedRunner).

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;

use crate::error::CommandFailure;

/// Captured result of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
    /// Exit code, or `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// A successful run with the given stdout.
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: Vec::new(),
            exit_code: Some(0),
        }
    }

    /// A failed run with the given exit code and stderr.
    pub fn failure(exit_code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
        }
    }

    /// Whether the command exited with status zero.
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Describe a failed run, or `None` if the run succeeded.
    ///
    /// Stderr is carried along when the command wrote any, since it is the
    /// only diagnostic the store tools produce.
    pub fn failure_of(&self, program: &Path) -> Option<CommandFailure> {
        if self.is_success() {
            return None;
        }
        let program = program.to_path_buf();
        if self.stderr.is_empty() {
            Some(CommandFailure::Exit {
                program,
                code: self.exit_code,
            })
        } else {
            Some(CommandFailure::Stderr {
                program,
                code: self.exit_code,
                stderr: String::from_utf8_lossy(&self.stderr).trim_end().to_string(),
            })
        }
    }
}

/// Runs an external program to completion and captures its output.
///
/// Implementations must not interpret the output; classification is the
/// caller's job. Dropping the returned future must stop the program.
#[async_trait]
pub trait CommandRunner: Send + Sync + std::fmt::Debug {
    /// Run `program` with `args`. An `Err` means the program could not be
    /// started or waited on; a non-zero exit is reported through
    /// [`CommandOutput::exit_code`].
    async fn run(&self, program: &Path, args: &[OsString]) -> std::io::Result<CommandOutput>;
}

/// Runs commands as child processes on the tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    working_dir: Option<PathBuf>,
}

impl ProcessRunner {
    /// Create a runner that inherits the current working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every command from `dir`.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &Path, args: &[OsString]) -> std::io::Result<CommandOutput> {
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(program = %program.display(), ?args, "running command");
        let output = cmd.output().await?;
        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code(),
        })
    }
}
