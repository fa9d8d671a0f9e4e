//! Shared layout constants and record types for sstable components.
//!
//! Every component payload is MessagePack framed with a u32 little-endian
//! length prefix. Checksummed layouts additionally open with a magic header
//! and close with a sentinel length followed by a crc32 of all preceding
//! bytes, sentinel included.

use crate::core::{Result, Row, StoreError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// First four bytes of every checksummed component, followed by the
/// two-byte version tag.
pub const MAGIC: [u8; 4] = *b"RSST";

/// Length value that terminates the frame sequence in checksummed layouts.
pub const FRAME_SENTINEL: u32 = u32::MAX;

/// Upper bound on a single frame. Lengths beyond this are treated as
/// corruption rather than allocated.
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Every n-th index entry is mirrored into the Summary component.
pub const SUMMARY_INTERVAL: u64 = 128;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    pub key: Vec<u8>,
    pub columns: Row,
}

impl RowRecord {
    pub fn new(key: impl Into<Vec<u8>>, columns: Row) -> Self {
        Self {
            key: key.into(),
            columns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub key: Vec<u8>,
    /// Byte offset of the row's frame within the Data component.
    pub position: u64,
}

/// Contents of the Statistics component. Carries no wall-clock fields;
/// rewriting identical rows yields identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub row_count: u64,
    pub min_token: Option<i64>,
    pub max_token: Option<i64>,
}

impl Statistics {
    pub fn observe(&mut self, token: i64) {
        self.row_count += 1;
        self.min_token = Some(self.min_token.map_or(token, |t| t.min(token)));
        self.max_token = Some(self.max_token.map_or(token, |t| t.max(token)));
    }
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    rmp_serde::to_vec(value)
        .map_err(|e| StoreError::Serialization(format!("Failed to encode record: {}", e)))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    rmp_serde::from_slice(bytes)
        .map_err(|e| StoreError::Serialization(format!("Failed to decode record: {}", e)))
}
