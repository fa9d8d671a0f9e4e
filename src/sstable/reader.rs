use crate::core::{Result, StoreError};
use crate::sstable::component::Component;
use crate::sstable::descriptor::{Descriptor, FileSet};
use crate::sstable::filter::BloomFilter;
use crate::sstable::format::{self, IndexEntry, RowRecord, Statistics};
use crate::sstable::version::FormatVersion;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

/// Frame-level access to one component file. Dispatches on the layout:
/// legacy components are bare frame sequences ending at EOF, checksummed
/// components carry a header and a sentinel + crc32 trailer.
struct FrameReader {
    reader: BufReader<File>,
    hasher: crc32fast::Hasher,
    framed: bool,
    finished: bool,
    path: PathBuf,
}

impl FrameReader {
    fn open(path: &Path, version: FormatVersion) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| StoreError::Io(format!("Failed to open '{}': {}", path.display(), e)))?;
        let mut frames = Self {
            reader: BufReader::new(file),
            hasher: crc32fast::Hasher::new(),
            framed: version.has_checksummed_layout(),
            finished: false,
            path: path.to_path_buf(),
        };
        if frames.framed {
            frames.read_header(version)?;
        }
        Ok(frames)
    }

    fn read_header(&mut self, version: FormatVersion) -> Result<()> {
        let mut header = [0u8; 6];
        self.reader.read_exact(&mut header).map_err(|_| {
            StoreError::Corruption(format!(
                "'{}' is too short to hold a component header",
                self.path.display()
            ))
        })?;
        if header[0..4] != format::MAGIC {
            return Err(StoreError::Corruption(format!(
                "Bad magic in '{}'",
                self.path.display()
            )));
        }
        let tag = FormatVersion::from_tag_bytes([header[4], header[5]])?;
        if tag != version {
            return Err(StoreError::Corruption(format!(
                "Version tag mismatch in '{}': header says '{}', filename says '{}'",
                self.path.display(),
                tag,
                version
            )));
        }
        self.hasher.update(&header);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        if self.finished {
            return Ok(None);
        }
        let mut len_bytes = [0u8; 4];
        match self.reader.read_exact(&mut len_bytes) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                if self.framed {
                    return Err(StoreError::Corruption(format!(
                        "'{}' ends without a trailer",
                        self.path.display()
                    )));
                }
                self.finished = true;
                return Ok(None);
            }
            Err(e) => {
                return Err(StoreError::Io(format!(
                    "Failed to read frame length from '{}': {}",
                    self.path.display(),
                    e
                )));
            }
        }

        let len = u32::from_le_bytes(len_bytes);
        if self.framed && len == format::FRAME_SENTINEL {
            self.hasher.update(&len_bytes);
            return self.verify_trailer();
        }
        if len as usize > format::MAX_FRAME_BYTES {
            return Err(StoreError::Corruption(format!(
                "Frame length {} in '{}' exceeds the limit",
                len,
                self.path.display()
            )));
        }

        let mut payload = vec![0u8; len as usize];
        self.reader.read_exact(&mut payload).map_err(|_| {
            StoreError::Corruption(format!("Truncated frame in '{}'", self.path.display()))
        })?;
        if self.framed {
            self.hasher.update(&len_bytes);
            self.hasher.update(&payload);
        }
        Ok(Some(payload))
    }

    fn verify_trailer(&mut self) -> Result<Option<Vec<u8>>> {
        let mut crc_bytes = [0u8; 4];
        self.reader.read_exact(&mut crc_bytes).map_err(|_| {
            StoreError::Corruption(format!(
                "'{}' ends without a checksum",
                self.path.display()
            ))
        })?;
        let expected = u32::from_le_bytes(crc_bytes);
        let actual = self.hasher.clone().finalize();
        if expected != actual {
            return Err(StoreError::Corruption(format!(
                "Checksum mismatch in '{}'",
                self.path.display()
            )));
        }
        let mut probe = [0u8; 1];
        match self.reader.read_exact(&mut probe) {
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {}
            Ok(()) => {
                return Err(StoreError::Corruption(format!(
                    "Trailing bytes after checksum in '{}'",
                    self.path.display()
                )));
            }
            Err(e) => {
                return Err(StoreError::Io(format!(
                    "Failed to read '{}': {}",
                    self.path.display(),
                    e
                )));
            }
        }
        self.finished = true;
        Ok(None)
    }
}

/// Streaming row iterator over a Data component. Fuses after the first
/// error.
pub struct RowIter {
    frames: FrameReader,
    failed: bool,
}

impl Iterator for RowIter {
    type Item = Result<RowRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.frames.next_frame() {
            Ok(Some(payload)) => match format::decode(&payload) {
                Ok(row) => Some(Ok(row)),
                Err(e) => {
                    self.failed = true;
                    Some(Err(e))
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Read access to one on-disk sstable. Holds no open file handles; each
/// read operation opens the component it needs.
#[derive(Debug, Clone)]
pub struct SSTableReader {
    descriptor: Descriptor,
    components: BTreeSet<Component>,
}

impl SSTableReader {
    /// Open a complete file set without validating its contents. Checks
    /// that the mandatory files exist and, for checksummed layouts, that
    /// the Data header is sane; rows are only validated when streamed.
    pub fn open_no_validation(set: FileSet) -> Result<Self> {
        let data_path = set.descriptor.path_for(Component::Data);
        let index_path = set.descriptor.path_for(Component::Index);
        if set.descriptor.version.has_checksummed_layout() {
            FrameReader::open(&data_path, set.descriptor.version)?;
        } else if !data_path.is_file() {
            return Err(StoreError::Io(format!(
                "Data component '{}' is missing",
                data_path.display()
            )));
        }
        if !index_path.is_file() {
            return Err(StoreError::Io(format!(
                "Index component '{}' is missing",
                index_path.display()
            )));
        }
        Ok(Self {
            descriptor: set.descriptor,
            components: set.components,
        })
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn components(&self) -> &BTreeSet<Component> {
        &self.components
    }

    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.components
            .iter()
            .map(|c| self.descriptor.path_for(*c))
            .collect()
    }

    pub fn rows(&self) -> Result<RowIter> {
        let frames = FrameReader::open(
            &self.descriptor.path_for(Component::Data),
            self.descriptor.version,
        )?;
        Ok(RowIter {
            frames,
            failed: false,
        })
    }

    pub fn read_index_entries(&self) -> Result<Vec<IndexEntry>> {
        let mut frames = FrameReader::open(
            &self.descriptor.path_for(Component::Index),
            self.descriptor.version,
        )?;
        let mut entries = Vec::new();
        while let Some(payload) = frames.next_frame()? {
            entries.push(format::decode(&payload)?);
        }
        Ok(entries)
    }

    pub fn read_statistics(&self) -> Result<Statistics> {
        self.read_single_payload(Component::Statistics)
    }

    pub fn read_filter(&self) -> Result<BloomFilter> {
        self.read_single_payload(Component::Filter)
    }

    pub fn read_summary(&self) -> Result<Vec<IndexEntry>> {
        self.read_single_payload(Component::Summary)
    }

    fn read_single_payload<T: DeserializeOwned>(&self, component: Component) -> Result<T> {
        let path = self.descriptor.path_for(component);
        let mut frames = FrameReader::open(&path, self.descriptor.version)?;
        let payload = frames.next_frame()?.ok_or_else(|| {
            StoreError::Corruption(format!("'{}' holds no payload", path.display()))
        })?;
        if frames.next_frame()?.is_some() {
            return Err(StoreError::Corruption(format!(
                "'{}' holds more than one payload",
                path.display()
            )));
        }
        format::decode(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::sstable::writer::SSTableWriter;
    use std::fs::{self, OpenOptions};
    use std::io::{Seek, SeekFrom, Write};
    use tempfile::TempDir;

    fn descriptor(dir: &TempDir, tag: &str, generation: u64) -> Descriptor {
        Descriptor::new(
            dir.path(),
            "ks1",
            "events",
            FormatVersion::parse(tag).unwrap(),
            generation,
        )
    }

    fn write_set(dir: &TempDir, tag: &str, generation: u64, rows: u64) -> FileSet {
        let mut writer = SSTableWriter::create(descriptor(dir, tag, generation)).unwrap();
        for i in 0..rows {
            writer
                .append(&RowRecord::new(
                    format!("key-{:05}", i).into_bytes(),
                    vec![Value::Integer(i as i64), Value::Boolean(i % 2 == 0)],
                ))
                .unwrap();
        }
        writer.finish().unwrap()
    }

    fn flip_last_byte(path: &Path) {
        let len = fs::metadata(path).unwrap().len();
        let mut file = OpenOptions::new().read(true).write(true).open(path).unwrap();
        file.seek(SeekFrom::Start(len - 1)).unwrap();
        let mut byte = [0u8; 1];
        file.read_exact(&mut byte).unwrap();
        file.seek(SeekFrom::Start(len - 1)).unwrap();
        file.write_all(&[byte[0] ^ 0xff]).unwrap();
    }

    #[test]
    fn test_round_trip_current_layout() {
        let dir = TempDir::new().unwrap();
        let set = write_set(&dir, "mc", 1, 300);
        let reader = SSTableReader::open_no_validation(set).unwrap();

        let rows: Vec<RowRecord> = reader.rows().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 300);
        assert_eq!(rows[0].key, b"key-00000");
        assert_eq!(rows[299].columns[0], Value::Integer(299));

        let index = reader.read_index_entries().unwrap();
        assert_eq!(index.len(), 300);
        // header is magic(4) + version tag(2)
        assert_eq!(index[0].position, 6);
        for pair in index.windows(2) {
            assert!(pair[0].position < pair[1].position);
        }
        for (row, entry) in rows.iter().zip(&index) {
            assert_eq!(row.key, entry.key);
        }

        let stats = reader.read_statistics().unwrap();
        assert_eq!(stats.row_count, 300);
        assert!(stats.min_token.unwrap() <= stats.max_token.unwrap());

        // one summary entry per 128 index entries
        let summary = reader.read_summary().unwrap();
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0], index[0]);
        assert_eq!(summary[1], index[128]);
        assert_eq!(summary[2], index[256]);

        let filter = reader.read_filter().unwrap();
        for row in &rows {
            assert!(filter.might_contain(&row.key));
        }
    }

    #[test]
    fn test_round_trip_legacy_layout() {
        let dir = TempDir::new().unwrap();
        let set = write_set(&dir, "ka", 4, 25);
        let reader = SSTableReader::open_no_validation(set).unwrap();

        let rows: Vec<RowRecord> = reader.rows().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 25);
        let index = reader.read_index_entries().unwrap();
        assert_eq!(index.len(), 25);
        // bare layout: the first frame starts at offset zero
        assert_eq!(index[0].position, 0);
    }

    #[test]
    fn test_checksum_mismatch_is_detected() {
        let dir = TempDir::new().unwrap();
        let set = write_set(&dir, "mc", 1, 20);
        let data_path = set.descriptor.path_for(Component::Data);
        flip_last_byte(&data_path);

        let reader = SSTableReader::open_no_validation(set).unwrap();
        let last = reader.rows().unwrap().last().unwrap();
        assert!(matches!(last, Err(StoreError::Corruption(_))));
    }

    #[test]
    fn test_truncated_component_is_detected() {
        let dir = TempDir::new().unwrap();
        let set = write_set(&dir, "mc", 1, 20);
        let data_path = set.descriptor.path_for(Component::Data);
        let len = fs::metadata(&data_path).unwrap().len();
        let file = OpenOptions::new().write(true).open(&data_path).unwrap();
        file.set_len(len - 8).unwrap();

        let reader = SSTableReader::open_no_validation(set).unwrap();
        let result: Result<Vec<RowRecord>> = reader.rows().unwrap().collect();
        assert!(matches!(result, Err(StoreError::Corruption(_))));
    }

    #[test]
    fn test_bad_magic_fails_open() {
        let dir = TempDir::new().unwrap();
        let set = write_set(&dir, "mc", 1, 5);
        let data_path = set.descriptor.path_for(Component::Data);
        let mut file = OpenOptions::new().write(true).open(&data_path).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.write_all(b"XXXX").unwrap();

        assert!(matches!(
            SSTableReader::open_no_validation(set),
            Err(StoreError::Corruption(_))
        ));
    }

    #[test]
    fn test_version_tag_mismatch_fails_open() {
        let dir = TempDir::new().unwrap();
        let set = write_set(&dir, "mc", 1, 5);

        // present the same files under a descriptor claiming a newer version
        let claimed = Descriptor::new(
            dir.path(),
            "ks1",
            "events",
            FormatVersion::parse("md").unwrap(),
            9,
        );
        for component in [Component::Data, Component::Index] {
            fs::copy(
                set.descriptor.path_for(component),
                claimed.path_for(component),
            )
            .unwrap();
        }
        let mut mislabeled = FileSet::new(claimed);
        mislabeled.components.insert(Component::Data);
        mislabeled.components.insert(Component::Index);

        assert!(matches!(
            SSTableReader::open_no_validation(mislabeled),
            Err(StoreError::Corruption(_))
        ));
    }

    #[test]
    fn test_missing_index_fails_open() {
        let dir = TempDir::new().unwrap();
        let set = write_set(&dir, "mc", 1, 5);
        fs::remove_file(set.descriptor.path_for(Component::Index)).unwrap();
        assert!(SSTableReader::open_no_validation(set).is_err());
    }

    #[test]
    fn test_legacy_truncated_mid_frame() {
        let dir = TempDir::new().unwrap();
        let set = write_set(&dir, "ka", 2, 10);
        let data_path = set.descriptor.path_for(Component::Data);
        let len = fs::metadata(&data_path).unwrap().len();
        let file = OpenOptions::new().write(true).open(&data_path).unwrap();
        file.set_len(len - 3).unwrap();

        let reader = SSTableReader::open_no_validation(set).unwrap();
        let result: Result<Vec<RowRecord>> = reader.rows().unwrap().collect();
        assert!(matches!(result, Err(StoreError::Corruption(_))));
    }
}
