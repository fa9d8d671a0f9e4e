use super::metadata::TableMetadata;
use crate::core::{Result, StoreError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Placement used when a keyspace is registered purely for local file
/// access. Never valid for serving traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalReplication {
    pub replication_factor: u32,
}

impl Default for LocalReplication {
    fn default() -> Self {
        Self {
            replication_factor: 1,
        }
    }
}

/// A minimal in-process keyspace registration: just enough structure to
/// resolve table directories, with none of the cluster state a real node
/// would carry.
#[derive(Debug, Clone)]
pub struct Keyspace {
    name: String,
    replication: LocalReplication,
    tables: HashMap<String, TableMetadata>,
}

impl Keyspace {
    /// Register a keyspace locally around metadata fetched from a peer.
    pub fn bootstrap_local(metadata: TableMetadata) -> Self {
        let name = metadata.keyspace.clone();
        let mut tables = HashMap::new();
        tables.insert(metadata.table.clone(), metadata);
        Self {
            name,
            replication: LocalReplication::default(),
            tables,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn replication(&self) -> LocalReplication {
        self.replication
    }

    pub fn table(&self, name: &str) -> Option<&TableMetadata> {
        self.tables.get(name)
    }

    /// Resolve a handle onto the table's directory. Performs no sstable
    /// discovery; the scanner owns that.
    pub fn open_table_without_sstables(&self, table: &str, data_root: &Path) -> Result<TableHandle> {
        let metadata = self
            .tables
            .get(table)
            .cloned()
            .ok_or_else(|| StoreError::TableNotFound(self.name.clone(), table.to_string()))?;
        let directory = data_root.join(&self.name).join(table);
        if !directory.is_dir() {
            return Err(StoreError::Config(format!(
                "Table directory '{}' does not exist",
                directory.display()
            )));
        }
        Ok(TableHandle {
            metadata,
            directory,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TableHandle {
    pub metadata: TableMetadata,
    pub directory: PathBuf,
}
