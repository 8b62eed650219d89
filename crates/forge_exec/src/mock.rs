//! Mock process runner for testing.
//!
//! Provides a configurable mock implementation of the ProcessRunner trait
//! so the recovery loop can be exercised without real package managers or
//! dev servers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::command::CommandSpec;
use crate::error::{ExecError, ExecResult};
use crate::process::{CommandOutput, ProcessRunner, ServiceLine, ServiceProcess};

/// Predefined mock response for a finite command.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub timed_out: bool,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 100,
            timed_out: false,
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms: 100,
            timed_out: false,
        }
    }

    pub fn timeout(stderr: impl Into<String>) -> Self {
        Self {
            exit_code: None,
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms: 100,
            timed_out: true,
        }
    }

    pub fn with_duration(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub method: String,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: String,
    pub env: Vec<(String, String)>,
}

/// Mock process runner for testing.
///
/// Finite commands consume scripted responses in order; spawned services
/// replay scripted output lines and track how often they were killed.
#[derive(Clone)]
pub struct MockRunner {
    /// Predefined responses for run calls, consumed in order.
    responses: Arc<RwLock<Vec<MockResponse>>>,
    /// Index of next response to return.
    response_index: Arc<AtomicUsize>,
    /// Output lines each spawned service replays, consumed in order.
    service_scripts: Arc<RwLock<Vec<Vec<ServiceLine>>>>,
    /// Index of next service script to use.
    service_index: Arc<AtomicUsize>,
    /// Kill counts, one slot per spawned service.
    kill_counts: Arc<RwLock<Vec<usize>>>,
    /// Captured calls for verification.
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    /// Simulated spawn failure message.
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(RwLock::new(Vec::new())),
            response_index: Arc::new(AtomicUsize::new(0)),
            service_scripts: Arc::new(RwLock::new(Vec::new())),
            service_index: Arc::new(AtomicUsize::new(0)),
            kill_counts: Arc::new(RwLock::new(Vec::new())),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
            simulate_failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Add a response for the next run call.
    pub fn add_response(self, response: MockResponse) -> Self {
        self.responses.write().push(response);
        self
    }

    /// Set all responses at once.
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        *self.responses.write() = responses;
        self
    }

    /// Script the output of the next spawned service.
    pub fn add_service_script(self, lines: Vec<ServiceLine>) -> Self {
        self.service_scripts.write().push(lines);
        self
    }

    /// Make every call fail at the spawn stage.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get calls to a specific method ("run" or "spawn_service").
    pub fn get_method_calls(&self, method: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    /// Number of services spawned so far.
    pub fn spawned_services(&self) -> usize {
        self.kill_counts.read().len()
    }

    /// Kill counts per spawned service, in spawn order.
    pub fn service_kill_counts(&self) -> Vec<usize> {
        self.kill_counts.read().clone()
    }

    fn record_call(&self, method: &str, spec: &CommandSpec) {
        self.captured_calls.write().push(CapturedCall {
            method: method.to_string(),
            program: spec.program.clone(),
            args: spec.args.clone(),
            cwd: spec.cwd.display().to_string(),
            env: spec.env.clone(),
        });
    }

    fn next_response(&self) -> MockResponse {
        let responses = self.responses.read();
        if responses.is_empty() {
            return MockResponse::success("");
        }
        let index = self.response_index.fetch_add(1, Ordering::SeqCst);
        responses
            .get(index % responses.len())
            .cloned()
            .unwrap_or_else(|| MockResponse::success(""))
    }

    fn next_service_script(&self) -> Vec<ServiceLine> {
        let scripts = self.service_scripts.read();
        if scripts.is_empty() {
            return Vec::new();
        }
        let index = self.service_index.fetch_add(1, Ordering::SeqCst);
        scripts.get(index % scripts.len()).cloned().unwrap_or_default()
    }

    fn check_failure(&self, program: &str) -> ExecResult<()> {
        if let Some(msg) = self.simulate_failure.read().clone() {
            return Err(ExecError::Spawn {
                program: program.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, msg),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ProcessRunner for MockRunner {
    async fn run(&self, spec: &CommandSpec) -> ExecResult<CommandOutput> {
        self.record_call("run", spec);
        self.check_failure(&spec.program)?;

        let response = self.next_response();
        let started_at = Utc::now();
        let finished_at = started_at + chrono::Duration::milliseconds(response.duration_ms as i64);

        Ok(CommandOutput {
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at,
            finished_at,
            duration_ms: response.duration_ms,
            timed_out: response.timed_out,
        })
    }

    async fn spawn_service(&self, spec: &CommandSpec) -> ExecResult<Box<dyn ServiceProcess>> {
        self.record_call("spawn_service", spec);
        self.check_failure(&spec.program)?;

        let slot = {
            let mut counts = self.kill_counts.write();
            counts.push(0);
            counts.len() - 1
        };

        Ok(Box::new(MockService {
            pending: self.next_service_script(),
            running: true,
            slot,
            kill_counts: self.kill_counts.clone(),
        }))
    }
}

/// A scripted service handle. Hands out its lines on the first drain.
pub struct MockService {
    pending: Vec<ServiceLine>,
    running: bool,
    slot: usize,
    kill_counts: Arc<RwLock<Vec<usize>>>,
}

impl ServiceProcess for MockService {
    fn read_available(&mut self) -> Vec<ServiceLine> {
        std::mem::take(&mut self.pending)
    }

    fn is_running(&mut self) -> bool {
        self.running
    }

    fn kill(&mut self) {
        self.running = false;
        if let Some(count) = self.kill_counts.write().get_mut(self.slot) {
            *count += 1;
        }
    }
}
