//! # forge_provision
//!
//! Run directory and artifact provisioning for appforge.
//!
//! Each generation request works in a disposable, timestamped copy of the
//! project template; diagnostics from the validation loop land in a
//! matching artifact directory. Both carry a mutable "latest" alias so
//! operators can find the newest run without reading timestamps.

pub mod artifacts;
pub mod error;
pub mod run_dir;

pub use artifacts::ArtifactStore;
pub use error::{ProvisionError, ProvisionResult};
pub use run_dir::{render_tree, run_suffix, slugify, ProvisionedRun, Provisioner};
