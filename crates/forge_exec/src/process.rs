//! Process runner traits and execution results.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::command::CommandSpec;
use crate::error::ExecResult;

/// Result of running a finite command.
///
/// Failure is data, not an error: a non-zero exit or a timeout comes back
/// as a `CommandOutput` carrying whatever output was captured before the
/// process stopped.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// None when the process was killed before exiting on its own.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// The command hit its time limit and was killed.
    pub timed_out: bool,
}

impl CommandOutput {
    /// Check if the command completed successfully.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Get combined stdout and stderr output.
    pub fn combined_output(&self) -> String {
        let mut output = String::new();
        if !self.stdout.is_empty() {
            output.push_str(&self.stdout);
        }
        if !self.stderr.is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&self.stderr);
        }
        output
    }

    /// Short description of why the command failed.
    pub fn failure_reason(&self) -> String {
        if self.timed_out {
            "timed out".to_string()
        } else {
            match self.exit_code {
                Some(code) => format!("exited with code {}", code),
                None => "terminated by signal".to_string(),
            }
        }
    }
}

/// Which stream a service line was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSource {
    Stdout,
    Stderr,
}

/// One line of output from a running service.
#[derive(Debug, Clone)]
pub struct ServiceLine {
    pub source: LineSource,
    pub text: String,
}

impl ServiceLine {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            source: LineSource::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            source: LineSource::Stderr,
            text: text.into(),
        }
    }
}

/// An owned handle to a long-running process such as a dev server.
///
/// The holder is responsible for calling [`ServiceProcess::kill`]; the
/// process is also killed when the handle is dropped, as a backstop.
pub trait ServiceProcess: Send {
    /// Drain the output lines buffered since the last call.
    fn read_available(&mut self) -> Vec<ServiceLine>;

    /// Whether the process is still alive.
    fn is_running(&mut self) -> bool;

    /// Stop the process. Calling this more than once is safe.
    fn kill(&mut self);
}

/// Trait for executing external commands.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run a command to completion, capturing its output. Respects the
    /// spec's timeout; a timed-out command is killed and reported with
    /// the output captured so far.
    async fn run(&self, spec: &CommandSpec) -> ExecResult<CommandOutput>;

    /// Start a long-running service and hand ownership of it back.
    async fn spawn_service(&self, spec: &CommandSpec) -> ExecResult<Box<dyn ServiceProcess>>;
}
