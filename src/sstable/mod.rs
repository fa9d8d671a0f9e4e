pub mod component;
pub mod descriptor;
pub mod filter;
pub mod format;
pub mod partitioner;
pub mod reader;
pub mod version;
pub mod writer;

pub use component::Component;
pub use descriptor::{Descriptor, FileSet};
pub use filter::BloomFilter;
pub use format::{IndexEntry, RowRecord, Statistics};
pub use reader::{RowIter, SSTableReader};
pub use version::FormatVersion;
pub use writer::SSTableWriter;
