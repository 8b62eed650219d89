//! Host process execution backed by `tokio::process`.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::command::CommandSpec;
use crate::error::{ExecError, ExecResult};
use crate::process::{CommandOutput, LineSource, ProcessRunner, ServiceLine, ServiceProcess};

/// Bounded tail of service output kept between drains; oldest lines drop
/// first.
const SERVICE_BUFFER_LINES: usize = 1000;

/// Runs commands directly on the host.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for ShellRunner {
    async fn run(&self, spec: &CommandSpec) -> ExecResult<CommandOutput> {
        debug!("Running: {}", spec.display_line());
        let started_at = Utc::now();
        let start = std::time::Instant::now();

        let mut child = build_command(spec).spawn().map_err(|e| ExecError::Spawn {
            program: spec.program.clone(),
            source: e,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_task = tokio::spawn(collect_stream(stdout));
        let stderr_task = tokio::spawn(collect_stream(stderr));

        let (exit_code, timed_out) = match spec.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => (status?.code(), false),
                Err(_) => {
                    warn!(
                        "'{}' exceeded {}s, killing it",
                        spec.display_line(),
                        limit.as_secs()
                    );
                    let _ = child.kill().await;
                    (None, true)
                }
            },
            None => (child.wait().await?.code(), false),
        };

        // Killing the child closes the pipes, so these finish either way.
        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr,
            started_at,
            finished_at: Utc::now(),
            duration_ms: start.elapsed().as_millis() as u64,
            timed_out,
        })
    }

    async fn spawn_service(&self, spec: &CommandSpec) -> ExecResult<Box<dyn ServiceProcess>> {
        debug!("Starting service: {}", spec.display_line());

        let mut child = build_command(spec).spawn().map_err(|e| ExecError::Spawn {
            program: spec.program.clone(),
            source: e,
        })?;

        let buffer: Arc<Mutex<Vec<ServiceLine>>> = Arc::new(Mutex::new(Vec::new()));

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(buffer_stream(stdout, LineSource::Stdout, buffer.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(buffer_stream(stderr, LineSource::Stderr, buffer.clone()));
        }

        Ok(Box::new(ShellService {
            child,
            buffer,
            killed: false,
        }))
    }
}

/// A spawned service process. Killed on drop via `kill_on_drop` if the
/// holder never calls [`ServiceProcess::kill`].
pub struct ShellService {
    child: Child,
    buffer: Arc<Mutex<Vec<ServiceLine>>>,
    killed: bool,
}

impl ServiceProcess for ShellService {
    fn read_available(&mut self) -> Vec<ServiceLine> {
        std::mem::take(&mut *self.buffer.lock())
    }

    fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn kill(&mut self) {
        if self.killed {
            return;
        }
        self.killed = true;

        if let Err(e) = self.child.start_kill() {
            debug!("Service process already gone: {}", e);
        }
        let _ = self.child.try_wait();
    }
}

fn build_command(spec: &CommandSpec) -> Command {
    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .current_dir(&spec.cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (key, value) in &spec.env {
        command.env(key, value);
    }

    // On Windows, use CREATE_NO_WINDOW to prevent terminal window from showing
    #[cfg(windows)]
    {
        const CREATE_NO_WINDOW: u32 = 0x08000000;
        command.creation_flags(CREATE_NO_WINDOW);
    }

    command
}

async fn collect_stream<R>(stream: Option<R>) -> String
where
    R: AsyncRead + Unpin + Send,
{
    let mut collected = String::new();
    if let Some(stream) = stream {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            collected.push_str(&line);
            collected.push('\n');
        }
    }
    collected
}

async fn buffer_stream<R>(stream: R, source: LineSource, buffer: Arc<Mutex<Vec<ServiceLine>>>)
where
    R: AsyncRead + Unpin + Send,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut buffer = buffer.lock();
        buffer.push(ServiceLine { source, text: line });
        if buffer.len() > SERVICE_BUFFER_LINES {
            buffer.remove(0);
        }
    }
}
