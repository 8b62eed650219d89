//! # forge_heal
//!
//! The self-healing validation loop for appforge.
//!
//! After a change plan lands in a run directory, this crate answers the
//! only question that matters: does the app actually start? It installs
//! dependencies, builds, and boots the dev server; failures are
//! classified from captured output, turned into a hotfix request for an
//! LLM, patched in, and retried, up to a fixed attempt budget. Every run
//! ends with a complete [`TestResult`] and markdown reports in the
//! artifact store.

pub mod classifier;
pub mod controller;
pub mod error;
pub mod hotfix;
pub mod llm;
pub mod mock;
pub mod report;

pub use controller::{HealState, RecoveryController, RecoveryOptions, TestResult};
pub use error::{HealError, HealResult};
pub use hotfix::{HotfixFix, HotfixGenerator, HotfixPlan, HotfixRequest, NullHotfixGenerator};
pub use llm::{LlmHotfixGenerator, LlmProvider};
pub use mock::MockHotfixGenerator;
pub use report::ReportWriter;
