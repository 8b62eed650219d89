//! # forge_patch
//!
//! Change-plan model and patch engine for appforge.
//!
//! A code generator proposes changes as a JSON plan: files to create with
//! full content, files to modify with small `oldText`/`newText` edits, and
//! files to delete. This crate parses those plans and applies them to a
//! project directory, tolerating the failure modes generated edits have in
//! practice (placeholder anchors, drifted whitespace, already-applied
//! edits, references to files that do not exist).
//!
//! ## Example
//!
//! ```rust,no_run
//! use forge_patch::{PatchEngine, Plan};
//!
//! let plan = Plan::from_json(r#"{"files": []}"#).unwrap();
//! for warning in plan.validate() {
//!     eprintln!("plan warning: {}", warning);
//! }
//!
//! let engine = PatchEngine::new("./my-app");
//! let outcome = engine.apply(&plan.files).unwrap();
//! println!("{} files changed", outcome.applied.len());
//! ```

pub mod engine;
pub mod error;
pub mod placeholder;
pub mod plan;

pub use engine::{apply_edits, ApplyOutcome, EditOutcome, PatchEngine};
pub use error::{PatchError, PatchResult};
pub use plan::{ChangeKind, FileChange, Plan, TextEdit};
