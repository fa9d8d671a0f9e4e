use crate::core::{Result, StoreError};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use std::fs;
use std::path::Path;

lazy_static! {
    // Snapshots prepend a 10-digit epoch timestamp to every filename.
    static ref SNAPSHOT_NAME: Regex = Regex::new(r"^[0-9]{10}-(.+)$").unwrap();
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub renamed: u64,
    pub failed: u64,
}

/// Strip snapshot timestamp prefixes from every filename in `dir` that
/// carries one. Best-effort: individual rename failures are logged and
/// counted, never escalated. Names already in canonical form do not match
/// the pattern, so a second pass is a no-op.
pub fn normalize_snapshot_names(dir: &Path) -> Result<NormalizeReport> {
    let entries = fs::read_dir(dir).map_err(|e| {
        StoreError::Io(format!("Failed to list '{}': {}", dir.display(), e))
    })?;

    let mut report = NormalizeReport::default();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in '{}': {}", dir.display(), e);
                report.failed += 1;
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            debug!("Skipping non-UTF-8 filename in '{}'", dir.display());
            continue;
        };
        let Some(captures) = SNAPSHOT_NAME.captures(name) else {
            continue;
        };
        let canonical = &captures[1];
        let target = dir.join(canonical);
        if target.exists() {
            warn!("Not renaming '{}': '{}' already exists", name, canonical);
            report.failed += 1;
            continue;
        }
        match fs::rename(entry.path(), &target) {
            Ok(()) => {
                info!("Renamed '{}' to '{}'", name, canonical);
                report.renamed += 1;
            }
            Err(e) => {
                warn!("Failed to rename '{}': {}", name, e);
                report.failed += 1;
            }
        }
    }
    Ok(report)
}
