//! The migration pipeline: filename normalization, remote metadata
//! bootstrap, directory scanning, per-set conversion, and the final
//! maintenance drain.

pub mod context;
pub mod normalize;
pub mod output;
pub mod run;
pub mod scan;
pub mod upgrader;

pub use context::{RuntimeContext, UpgradeConfig};
pub use normalize::{NormalizeReport, normalize_snapshot_names};
pub use output::OutputHandler;
pub use run::{RunOutcome, RunResult, run_upgrade, run_with_context};
pub use scan::{SkipReason, SkippedSet, StaleSelection, scan_table_dir, select_stale};
pub use upgrader::{JobStatus, UpgradeJob, Upgrader};
