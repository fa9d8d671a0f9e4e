use crate::core::ColumnDef;
use crate::sstable::partitioner;
use serde::{Deserialize, Serialize};

/// Definition of one table as served by a peer node. Fetched over the
/// schema protocol during bootstrap and discarded at exit; this process
/// never persists or invents schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub keyspace: String,
    pub table: String,
    pub columns: Vec<ColumnDef>,
    pub partitioner: String,
}

impl TableMetadata {
    pub fn new(
        keyspace: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<ColumnDef>,
    ) -> Self {
        Self {
            keyspace: keyspace.into(),
            table: table.into(),
            columns,
            partitioner: partitioner::PARTITIONER_NAME.to_string(),
        }
    }

    pub fn with_partitioner(mut self, name: impl Into<String>) -> Self {
        self.partitioner = name.into();
        self
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.keyspace, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataType;

    #[test]
    fn test_defaults_to_supported_partitioner() {
        let meta = TableMetadata::new(
            "ks1",
            "events",
            vec![ColumnDef::new("id", DataType::Integer)],
        );
        assert!(partitioner::is_supported(&meta.partitioner));
        assert_eq!(meta.qualified_name(), "ks1.events");
    }

    #[test]
    fn test_with_partitioner_overrides() {
        let meta = TableMetadata::new("ks1", "events", vec![])
            .with_partitioner("Murmur3Partitioner");
        assert!(!partitioner::is_supported(&meta.partitioner));
    }
}
