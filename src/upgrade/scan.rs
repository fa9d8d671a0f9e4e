use crate::core::{Result, StoreError};
use crate::schema::TableHandle;
use crate::sstable::{Component, Descriptor, FileSet, FormatVersion, SSTableReader};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;

/// Enumerate the file sets present in the table's directory. Filenames
/// that do not parse, or that belong to a different table, are skipped.
/// Output is ordered by (generation, version) so repeated scans of the
/// same directory log identically.
pub fn scan_table_dir(handle: &TableHandle) -> Result<Vec<FileSet>> {
    let dir = &handle.directory;
    let entries = fs::read_dir(dir)
        .map_err(|e| StoreError::Io(format!("Failed to list '{}': {}", dir.display(), e)))?;

    let mut sets: BTreeMap<(u64, FormatVersion), FileSet> = BTreeMap::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in '{}': {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some((descriptor, component)) = Descriptor::parse_filename(dir, name) else {
            debug!("Skipping '{}': not an sstable component", name);
            continue;
        };
        if descriptor.keyspace != handle.metadata.keyspace
            || descriptor.table != handle.metadata.table
        {
            debug!("Skipping '{}': belongs to another table", name);
            continue;
        }
        sets.entry((descriptor.generation, descriptor.version))
            .or_insert_with(|| FileSet::new(descriptor))
            .components
            .insert(component);
    }
    Ok(sets.into_values().collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Incomplete(Vec<Component>),
    UpToDate,
    OpenFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Incomplete(missing) => {
                let names: Vec<String> = missing.iter().map(|c| c.to_string()).collect();
                write!(f, "missing components: {}", names.join(", "))
            }
            SkipReason::UpToDate => write!(f, "already on the current format"),
            SkipReason::OpenFailed(cause) => write!(f, "failed to open: {}", cause),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkippedSet {
    pub descriptor: Descriptor,
    pub reason: SkipReason,
}

/// Result of filtering a scan: readers for every complete, stale,
/// openable set, plus an account of everything passed over.
#[derive(Debug)]
pub struct StaleSelection {
    pub ready: Vec<SSTableReader>,
    pub skipped: Vec<SkippedSet>,
}

/// Partition scanned sets into those eligible for upgrading and those to
/// leave alone. A set qualifies only when it is complete, strictly older
/// than `current`, and opens cleanly; any one bad set never stops the
/// others from qualifying.
pub fn select_stale(sets: Vec<FileSet>, current: FormatVersion) -> StaleSelection {
    let mut ready = Vec::new();
    let mut skipped = Vec::new();

    for set in sets {
        if !set.is_complete() {
            debug!("Skipping {}: incomplete", set.descriptor);
            skipped.push(SkippedSet {
                reason: SkipReason::Incomplete(set.missing_required()),
                descriptor: set.descriptor,
            });
            continue;
        }
        if !set.descriptor.version.is_stale(current) {
            debug!("Skipping {}: not stale", set.descriptor);
            skipped.push(SkippedSet {
                reason: SkipReason::UpToDate,
                descriptor: set.descriptor,
            });
            continue;
        }
        let descriptor = set.descriptor.clone();
        match SSTableReader::open_no_validation(set) {
            Ok(reader) => ready.push(reader),
            Err(e) => {
                warn!("Failed to open {}: {}", descriptor, e);
                skipped.push(SkippedSet {
                    reason: SkipReason::OpenFailed(e.to_string()),
                    descriptor,
                });
            }
        }
    }

    StaleSelection { ready, skipped }
}
