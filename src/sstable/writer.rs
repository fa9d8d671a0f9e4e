//! Version-parameterized sstable writer.
//!
//! All components are written to temp files in the target directory and
//! renamed into place only in `finish`, so an interrupted or failed write
//! never leaves a usable-looking set behind.

use crate::core::{Result, StoreError};
use crate::sstable::component::Component;
use crate::sstable::descriptor::{Descriptor, FileSet};
use crate::sstable::filter::BloomFilter;
use crate::sstable::format::{self, IndexEntry, RowRecord, Statistics};
use crate::sstable::partitioner;
use serde::Serialize;
use std::io::{BufWriter, Write};
use tempfile::NamedTempFile;

struct ComponentWriter {
    writer: BufWriter<NamedTempFile>,
    hasher: crc32fast::Hasher,
    position: u64,
    framed: bool,
    context: String,
}

impl ComponentWriter {
    fn create(descriptor: &Descriptor) -> Result<Self> {
        let temp = NamedTempFile::new_in(&descriptor.directory).map_err(|e| {
            StoreError::Io(format!(
                "Failed to create temp file in '{}': {}",
                descriptor.directory.display(),
                e
            ))
        })?;
        let mut writer = Self {
            writer: BufWriter::new(temp),
            hasher: crc32fast::Hasher::new(),
            position: 0,
            framed: descriptor.version.has_checksummed_layout(),
            context: descriptor.to_string(),
        };
        if writer.framed {
            let mut header = [0u8; 6];
            header[0..4].copy_from_slice(&format::MAGIC);
            header[4..6].copy_from_slice(&descriptor.version.tag_bytes());
            writer.write_raw(&header)?;
        }
        Ok(writer)
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes).map_err(|e| {
            StoreError::Io(format!("Failed to write component for {}: {}", self.context, e))
        })?;
        if self.framed {
            self.hasher.update(bytes);
        }
        self.position += bytes.len() as u64;
        Ok(())
    }

    /// Write one length-prefixed frame, returning the offset it starts at.
    fn write_frame_bytes(&mut self, payload: &[u8]) -> Result<u64> {
        if payload.len() > format::MAX_FRAME_BYTES {
            return Err(StoreError::Serialization(format!(
                "Record of {} bytes exceeds the frame limit",
                payload.len()
            )));
        }
        let offset = self.position;
        let len = payload.len() as u32;
        self.write_raw(&len.to_le_bytes())?;
        self.write_raw(payload)?;
        Ok(offset)
    }

    /// Write the trailer (checksummed layouts only), flush and sync. The
    /// temp file is returned unrenamed so the caller controls placement.
    fn seal(mut self) -> Result<NamedTempFile> {
        if self.framed {
            self.write_raw(&format::FRAME_SENTINEL.to_le_bytes())?;
            let crc = self.hasher.clone().finalize();
            self.writer.write_all(&crc.to_le_bytes()).map_err(|e| {
                StoreError::Io(format!(
                    "Failed to write checksum for {}: {}",
                    self.context, e
                ))
            })?;
        }
        let temp = self.writer.into_inner().map_err(|e| {
            StoreError::Io(format!("Failed to flush component for {}: {}", self.context, e))
        })?;
        temp.as_file().sync_all().map_err(|e| {
            StoreError::Io(format!("Failed to sync component for {}: {}", self.context, e))
        })?;
        Ok(temp)
    }
}

pub struct SSTableWriter {
    descriptor: Descriptor,
    data: ComponentWriter,
    index: ComponentWriter,
    summary: Vec<IndexEntry>,
    statistics: Statistics,
    key_hashes: Vec<(u64, u64)>,
    rows_written: u64,
}

impl SSTableWriter {
    pub fn create(descriptor: Descriptor) -> Result<Self> {
        let data = ComponentWriter::create(&descriptor)?;
        let index = ComponentWriter::create(&descriptor)?;
        Ok(Self {
            descriptor,
            data,
            index,
            summary: Vec::new(),
            statistics: Statistics::default(),
            key_hashes: Vec::new(),
            rows_written: 0,
        })
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn append(&mut self, row: &RowRecord) -> Result<()> {
        let payload = format::encode(row)?;
        let position = self.data.write_frame_bytes(&payload)?;

        let entry = IndexEntry {
            key: row.key.clone(),
            position,
        };
        let entry_bytes = format::encode(&entry)?;
        self.index.write_frame_bytes(&entry_bytes)?;
        if self.rows_written % format::SUMMARY_INTERVAL == 0 {
            self.summary.push(entry);
        }

        self.statistics
            .observe(partitioner::partition_token(&row.key));
        self.key_hashes.push(BloomFilter::key_hashes(&row.key));
        self.rows_written += 1;
        Ok(())
    }

    /// Seal and place every component. Auxiliary components land first and
    /// Data last, so a set can only ever look complete once all of it is
    /// durable.
    pub fn finish(self) -> Result<FileSet> {
        let SSTableWriter {
            descriptor,
            data,
            index,
            summary,
            statistics,
            key_hashes,
            rows_written: _,
        } = self;

        let data_tmp = data.seal()?;
        let index_tmp = index.seal()?;

        let mut staged: Vec<(Component, NamedTempFile)> = Vec::new();
        if descriptor.version.has_checksummed_layout() {
            let mut filter = BloomFilter::with_capacity(key_hashes.len());
            for hashes in &key_hashes {
                filter.insert_hashes(*hashes);
            }
            staged.push((Component::Filter, write_single(&descriptor, &filter)?));
            staged.push((Component::Statistics, write_single(&descriptor, &statistics)?));
            staged.push((Component::Summary, write_single(&descriptor, &summary)?));
        }
        staged.push((Component::Index, index_tmp));
        staged.push((Component::Data, data_tmp));

        let mut set = FileSet::new(descriptor.clone());
        for (component, temp) in staged {
            let path = descriptor.path_for(component);
            temp.persist(&path).map_err(|e| {
                StoreError::Io(format!(
                    "Failed to persist {} component '{}': {}",
                    component,
                    path.display(),
                    e
                ))
            })?;
            set.components.insert(component);
        }
        Ok(set)
    }
}

fn write_single<T: Serialize>(descriptor: &Descriptor, value: &T) -> Result<NamedTempFile> {
    let mut writer = ComponentWriter::create(descriptor)?;
    let payload = format::encode(value)?;
    writer.write_frame_bytes(&payload)?;
    writer.seal()
}
