//! # forge_exec
//!
//! External process orchestration for appforge.
//!
//! The validation loop shells out for everything it checks: installing
//! dependencies, building, typechecking, and serving the app under test.
//! This crate owns those interactions behind a [`ProcessRunner`] trait,
//! with a tokio-backed [`ShellRunner`] for real runs and a scripted
//! [`MockRunner`] for tests.
//!
//! Finite commands come back as [`CommandOutput`]: exit code, captured
//! streams, and whether the time limit was hit. Long-running services are
//! owned [`ServiceProcess`] handles whose buffered output is drained with
//! `read_available()` and which must be killed by the holder.

pub mod command;
pub mod error;
pub mod mock;
pub mod process;
pub mod shell;

pub use command::{CommandSpec, Toolchain, TOOLCHAIN_MANIFEST};
pub use error::{ExecError, ExecResult};
pub use mock::{CapturedCall, MockResponse, MockRunner, MockService};
pub use process::{CommandOutput, LineSource, ProcessRunner, ServiceLine, ServiceProcess};
pub use shell::{ShellRunner, ShellService};
