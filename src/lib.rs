// ============================================================================
// RustSSTable Library
// ============================================================================

pub mod core;
pub mod maintenance;
pub mod remote;
pub mod schema;
pub mod sstable;
pub mod upgrade;

// Re-export main types for convenience
pub use core::{DataType, Result, StoreError, Value};
pub use sstable::{Component, Descriptor, FileSet, FormatVersion, SSTableReader, SSTableWriter};

// Re-export the pipeline API
pub use upgrade::{
    RunOutcome, RunResult, RuntimeContext, UpgradeConfig, run_upgrade, run_with_context,
};

pub use maintenance::MaintenanceManager;
pub use remote::{SchemaCatalog, SchemaClient, SchemaServer};
pub use schema::{Keyspace, TableMetadata};
