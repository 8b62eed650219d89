//! Command specifications and toolchain presets.
//!
//! A [`Toolchain`] names the commands a project stack uses to install,
//! build, serve, and typecheck, plus the files that betray its state
//! (dependency directory, lock file, manifest). The built-in preset is the
//! npm stack; templates can override any field through a `forge.yaml` at
//! their root.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ExecError, ExecResult};

/// Optional per-template toolchain override file.
pub const TOOLCHAIN_MANIFEST: &str = "forge.yaml";

/// One external command, fully specified.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    /// None means the command may run indefinitely (services).
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: PathBuf::from("."),
            env: Vec::new(),
            timeout: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args.extend(args);
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Bound the command's runtime.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The command as a single loggable line.
    pub fn display_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// A project stack's commands and marker files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Toolchain {
    pub name: String,
    pub install: Vec<String>,
    pub build: Vec<String>,
    pub dev: Vec<String>,
    pub typecheck: Option<Vec<String>>,
    /// Directory that holds installed dependencies.
    pub dependency_dir: String,
    /// Lock file that pins them.
    pub lock_file: String,
    /// Manifest that must exist for the project to be installable at all.
    pub manifest_file: String,
    /// Config file required before typechecking makes sense.
    pub typecheck_config: Option<String>,
    pub install_timeout_secs: u64,
    pub build_timeout_secs: u64,
    pub typecheck_timeout_secs: u64,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::node()
    }
}

impl Toolchain {
    /// The npm stack used by the bundled web templates.
    pub fn node() -> Self {
        Self {
            name: "node".to_string(),
            install: vec!["npm".to_string(), "install".to_string()],
            build: vec!["npm".to_string(), "run".to_string(), "build".to_string()],
            dev: vec!["npm".to_string(), "run".to_string(), "dev".to_string()],
            typecheck: Some(vec![
                "npx".to_string(),
                "tsc".to_string(),
                "--noEmit".to_string(),
            ]),
            dependency_dir: "node_modules".to_string(),
            lock_file: "package-lock.json".to_string(),
            manifest_file: "package.json".to_string(),
            typecheck_config: Some("tsconfig.json".to_string()),
            install_timeout_secs: 180,
            build_timeout_secs: 180,
            typecheck_timeout_secs: 120,
        }
    }

    /// Load the toolchain for a template, falling back to the npm preset
    /// when no `forge.yaml` is present. Missing fields keep their preset
    /// values, so an override only has to name what differs.
    pub fn load(dir: &Path) -> ExecResult<Self> {
        let path = dir.join(TOOLCHAIN_MANIFEST);
        if !path.exists() {
            return Ok(Self::node());
        }

        let raw = fs::read_to_string(&path)?;
        let toolchain: Toolchain = serde_yaml::from_str(&raw)?;
        toolchain.validate()?;
        info!("Loaded toolchain '{}' from {:?}", toolchain.name, path);
        Ok(toolchain)
    }

    fn validate(&self) -> ExecResult<()> {
        for (label, command) in [
            ("install", &self.install),
            ("build", &self.build),
            ("dev", &self.dev),
        ] {
            if command.is_empty() {
                return Err(ExecError::InvalidToolchain(format!(
                    "{} command is empty",
                    label
                )));
            }
        }

        if matches!(&self.typecheck, Some(command) if command.is_empty()) {
            return Err(ExecError::InvalidToolchain(
                "typecheck command is empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn install_spec(&self, run_dir: &Path) -> CommandSpec {
        spec_from(&self.install, run_dir)
            .timeout(Duration::from_secs(self.install_timeout_secs))
    }

    pub fn build_spec(&self, run_dir: &Path) -> CommandSpec {
        spec_from(&self.build, run_dir)
            .env("CI", "true")
            .timeout(Duration::from_secs(self.build_timeout_secs))
    }

    /// The dev server command. Runs until killed, so no timeout.
    pub fn dev_spec(&self, run_dir: &Path) -> CommandSpec {
        spec_from(&self.dev, run_dir).env("CI", "true")
    }

    pub fn typecheck_spec(&self, run_dir: &Path) -> Option<CommandSpec> {
        self.typecheck.as_ref().map(|command| {
            spec_from(command, run_dir)
                .env("CI", "true")
                .timeout(Duration::from_secs(self.typecheck_timeout_secs))
        })
    }

    pub fn manifest_path(&self, run_dir: &Path) -> PathBuf {
        run_dir.join(&self.manifest_file)
    }

    pub fn has_manifest(&self, run_dir: &Path) -> bool {
        self.manifest_path(run_dir).exists()
    }

    /// Whether installed dependencies can be reused instead of reinstalled.
    pub fn dependencies_present(&self, run_dir: &Path) -> bool {
        run_dir.join(&self.dependency_dir).exists() && run_dir.join(&self.lock_file).exists()
    }

    /// Whether a typecheck is defined and its config file is in place.
    pub fn typecheck_ready(&self, run_dir: &Path) -> bool {
        if self.typecheck.is_none() {
            return false;
        }
        match &self.typecheck_config {
            Some(config) => run_dir.join(config).exists(),
            None => true,
        }
    }
}

fn spec_from(command: &[String], cwd: &Path) -> CommandSpec {
    let (program, args) = command
        .split_first()
        .map(|(p, rest)| (p.clone(), rest.to_vec()))
        .unwrap_or_default();
    CommandSpec::new(program).args(args).cwd(cwd)
}
