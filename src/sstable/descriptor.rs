use super::component::Component;
use super::version::FormatVersion;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Identity of one sstable within a table directory. Rendered into
/// filenames as `<keyspace>-<table>-<version>-<generation>-<Component>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub directory: PathBuf,
    pub keyspace: String,
    pub table: String,
    pub version: FormatVersion,
    pub generation: u64,
}

impl Descriptor {
    pub fn new(
        directory: impl Into<PathBuf>,
        keyspace: impl Into<String>,
        table: impl Into<String>,
        version: FormatVersion,
        generation: u64,
    ) -> Self {
        Self {
            directory: directory.into(),
            keyspace: keyspace.into(),
            table: table.into(),
            version,
            generation,
        }
    }

    pub fn filename_for(&self, component: Component) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            self.keyspace,
            self.table,
            self.version,
            self.generation,
            component.file_suffix()
        )
    }

    pub fn path_for(&self, component: Component) -> PathBuf {
        self.directory.join(self.filename_for(component))
    }

    /// Parse one directory entry. Returns `None` for anything that is not a
    /// well-formed sstable filename; the caller decides whether to log.
    pub fn parse_filename(directory: &Path, name: &str) -> Option<(Descriptor, Component)> {
        let parts: Vec<&str> = name.splitn(5, '-').collect();
        if parts.len() != 5 {
            return None;
        }
        let keyspace = parts[0];
        let table = parts[1];
        if keyspace.is_empty() || table.is_empty() {
            return None;
        }
        let version = FormatVersion::parse(parts[2]).ok()?;
        let generation = parts[3].parse::<u64>().ok()?;
        let component = Component::parse(parts[4])?;
        Some((
            Descriptor::new(directory, keyspace, table, version, generation),
            component,
        ))
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.keyspace, self.table, self.version, self.generation
        )
    }
}

/// A descriptor plus the components actually found on disk for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSet {
    pub descriptor: Descriptor,
    pub components: BTreeSet<Component>,
}

impl FileSet {
    pub fn new(descriptor: Descriptor) -> Self {
        Self {
            descriptor,
            components: BTreeSet::new(),
        }
    }

    /// A set is usable only when both the data file and its primary index
    /// are present.
    pub fn is_complete(&self) -> bool {
        self.components.contains(&Component::Data) && self.components.contains(&Component::Index)
    }

    pub fn missing_required(&self) -> Vec<Component> {
        [Component::Data, Component::Index]
            .into_iter()
            .filter(|c| !self.components.contains(c))
            .collect()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.components
            .iter()
            .map(|c| self.descriptor.path_for(*c))
            .collect()
    }
}
