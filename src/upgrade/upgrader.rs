use super::output::OutputHandler;
use crate::core::{Result, StoreError};
use crate::schema::TableMetadata;
use crate::sstable::{Component, Descriptor, FileSet, RowRecord, SSTableReader, SSTableWriter};

/// One attempt to convert a single file set. Created Pending, driven
/// through InProgress by the run loop, and ends Succeeded or Failed.
#[derive(Debug, Clone)]
pub struct UpgradeJob {
    pub source: Descriptor,
    pub target: Descriptor,
    pub status: JobStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed(String),
}

impl UpgradeJob {
    pub fn new(source: Descriptor, target: Descriptor) -> Self {
        Self {
            source,
            target,
            status: JobStatus::Pending,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}

/// Streams one source sstable into a new set at the target descriptor.
/// Writes only to fresh files; the source is never modified, so a failed
/// upgrade leaves the directory exactly as it found it.
pub struct Upgrader<'a> {
    metadata: &'a TableMetadata,
    source: &'a SSTableReader,
    target: Descriptor,
    handler: &'a OutputHandler,
}

impl<'a> Upgrader<'a> {
    pub fn new(
        metadata: &'a TableMetadata,
        source: &'a SSTableReader,
        target: Descriptor,
        handler: &'a OutputHandler,
    ) -> Self {
        Self {
            metadata,
            source,
            target,
            handler,
        }
    }

    pub fn upgrade(self) -> Result<FileSet> {
        self.handler.output(format!(
            "Upgrading {}",
            self.source.descriptor().path_for(Component::Data).display()
        ));

        let mut writer = SSTableWriter::create(self.target)?;
        for row in self.source.rows()? {
            let row = row?;
            validate_row(self.metadata, &row)?;
            writer.append(&row)?;
        }
        let set = writer.finish()?;

        self.handler.output(format!(
            "Upgrade of {} complete.",
            self.source.descriptor()
        ));
        Ok(set)
    }
}

fn validate_row(metadata: &TableMetadata, row: &RowRecord) -> Result<()> {
    if row.columns.len() != metadata.columns.len() {
        return Err(StoreError::TypeMismatch(format!(
            "Row has {} columns, schema for '{}' defines {}",
            row.columns.len(),
            metadata.qualified_name(),
            metadata.columns.len()
        )));
    }
    for (def, value) in metadata.columns.iter().zip(&row.columns) {
        def.validate(value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnDef, DataType, Value};
    use crate::sstable::FormatVersion;
    use std::fs;
    use tempfile::TempDir;

    fn metadata() -> TableMetadata {
        TableMetadata::new(
            "ks1",
            "events",
            vec![
                ColumnDef::new("id", DataType::Integer).not_null(),
                ColumnDef::new("note", DataType::Text),
            ],
        )
    }

    fn descriptor(dir: &TempDir, tag: &str, generation: u64) -> Descriptor {
        Descriptor::new(
            dir.path(),
            "ks1",
            "events",
            FormatVersion::parse(tag).unwrap(),
            generation,
        )
    }

    fn write_source(dir: &TempDir, rows: &[RowRecord]) -> SSTableReader {
        let mut writer = SSTableWriter::create(descriptor(dir, "ka", 1)).unwrap();
        for row in rows {
            writer.append(row).unwrap();
        }
        SSTableReader::open_no_validation(writer.finish().unwrap()).unwrap()
    }

    #[test]
    fn test_upgrade_preserves_rows() {
        let dir = TempDir::new().unwrap();
        let rows: Vec<RowRecord> = (0..50i64)
            .map(|i| {
                RowRecord::new(
                    format!("key-{:03}", i).into_bytes(),
                    vec![Value::Integer(i), Value::Text(format!("note {}", i))],
                )
            })
            .collect();
        let source = write_source(&dir, &rows);
        let handler = OutputHandler::new(false);

        let set = Upgrader::new(&metadata(), &source, descriptor(&dir, "mc", 2), &handler)
            .upgrade()
            .unwrap();

        assert_eq!(set.descriptor.version, FormatVersion::parse("mc").unwrap());
        assert!(set.is_complete());
        let upgraded = SSTableReader::open_no_validation(set).unwrap();
        let read_back: Vec<RowRecord> = upgraded.rows().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(read_back, rows);
    }

    #[test]
    fn test_failed_upgrade_writes_nothing() {
        let dir = TempDir::new().unwrap();
        // second row is wider than the schema allows
        let source = write_source(
            &dir,
            &[
                RowRecord::new(b"a".to_vec(), vec![Value::Integer(1), Value::Null]),
                RowRecord::new(
                    b"b".to_vec(),
                    vec![Value::Integer(2), Value::Null, Value::Boolean(true)],
                ),
            ],
        );
        let handler = OutputHandler::new(false);
        let target = descriptor(&dir, "mc", 2);

        let result = Upgrader::new(&metadata(), &source, target.clone(), &handler).upgrade();
        assert!(matches!(result, Err(StoreError::TypeMismatch(_))));

        for component in Component::ALL {
            assert!(!target.path_for(component).exists());
        }
        // the source set is still there, byte-for-byte
        assert!(source.descriptor().path_for(Component::Data).is_file());
    }

    #[test]
    fn test_type_violation_is_rejected() {
        let dir = TempDir::new().unwrap();
        let source = write_source(
            &dir,
            &[RowRecord::new(
                b"a".to_vec(),
                vec![Value::Text("not an integer".to_string()), Value::Null],
            )],
        );
        let handler = OutputHandler::new(false);

        let result =
            Upgrader::new(&metadata(), &source, descriptor(&dir, "mc", 2), &handler).upgrade();
        assert!(matches!(result, Err(StoreError::TypeMismatch(_))));
    }

    #[test]
    fn test_null_in_not_null_column_is_rejected() {
        let dir = TempDir::new().unwrap();
        let source = write_source(
            &dir,
            &[RowRecord::new(b"a".to_vec(), vec![Value::Null, Value::Null])],
        );
        let handler = OutputHandler::new(false);

        let result =
            Upgrader::new(&metadata(), &source, descriptor(&dir, "mc", 2), &handler).upgrade();
        assert!(matches!(result, Err(StoreError::TypeMismatch(_))));
    }

    #[test]
    fn test_source_files_unchanged_after_failure() {
        let dir = TempDir::new().unwrap();
        let source = write_source(
            &dir,
            &[RowRecord::new(
                b"a".to_vec(),
                vec![Value::Boolean(true), Value::Null],
            )],
        );
        let data_path = source.descriptor().path_for(Component::Data);
        let index_path = source.descriptor().path_for(Component::Index);
        let data_before = fs::read(&data_path).unwrap();
        let index_before = fs::read(&index_path).unwrap();
        let handler = OutputHandler::new(false);

        let result =
            Upgrader::new(&metadata(), &source, descriptor(&dir, "mc", 2), &handler).upgrade();
        assert!(result.is_err());
        assert_eq!(fs::read(&data_path).unwrap(), data_before);
        assert_eq!(fs::read(&index_path).unwrap(), index_before);
    }
}
