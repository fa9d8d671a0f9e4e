use crate::core::{Result, StoreError};
use crate::maintenance::DEFAULT_COMPACTION_DRAIN_TIMEOUT;
use crate::sstable::FormatVersion;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything a run can be told from the outside. Built with defaults
/// matching a local single-node setup, then overridden per flag.
#[derive(Debug, Clone)]
pub struct UpgradeConfig {
    pub keyspace: String,
    pub table: String,
    pub data_root: PathBuf,
    pub peer_host: String,
    pub peer_port: u16,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub compaction_drain_timeout: Duration,
    pub keep_source: bool,
    pub debug: bool,
    pub current_version: FormatVersion,
}

impl UpgradeConfig {
    pub fn new(keyspace: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            table: table.into(),
            data_root: PathBuf::from("./data"),
            peer_host: "127.0.0.1".to_string(),
            peer_port: 9160,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            compaction_drain_timeout: DEFAULT_COMPACTION_DRAIN_TIMEOUT,
            keep_source: false,
            debug: false,
            current_version: FormatVersion::CURRENT,
        }
    }

    pub fn with_data_root(mut self, data_root: impl Into<PathBuf>) -> Self {
        self.data_root = data_root.into();
        self
    }

    pub fn with_peer(mut self, host: impl Into<String>, port: u16) -> Self {
        self.peer_host = host.into();
        self.peer_port = port;
        self
    }

    pub fn with_keep_source(mut self, keep_source: bool) -> Self {
        self.keep_source = keep_source;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_current_version(mut self, version: FormatVersion) -> Self {
        self.current_version = version;
        self
    }

    pub fn with_compaction_drain_timeout(mut self, timeout: Duration) -> Self {
        self.compaction_drain_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_name("keyspace", &self.keyspace)?;
        validate_name("table", &self.table)?;
        if self.peer_port == 0 {
            return Err(StoreError::Config(
                "Peer port must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

// '-' is the filename separator, so names are restricted to what the
// filename grammar can round-trip.
fn validate_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StoreError::Config(format!("Empty {} name", what)));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StoreError::Config(format!(
            "Invalid {} name '{}': only alphanumerics and underscores are allowed",
            what, name
        )));
    }
    Ok(())
}

/// Immutable snapshot of a validated configuration. Constructing one is
/// the single entry point into a run; everything downstream borrows it
/// and nothing can change it mid-flight.
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    config: UpgradeConfig,
}

impl RuntimeContext {
    pub fn initialize(config: UpgradeConfig) -> Result<Self> {
        config.validate()?;
        if !config.data_root.is_dir() {
            return Err(StoreError::Config(format!(
                "Data root '{}' is not a directory",
                config.data_root.display()
            )));
        }
        Ok(Self { config })
    }

    pub fn keyspace(&self) -> &str {
        &self.config.keyspace
    }

    pub fn table(&self) -> &str {
        &self.config.table
    }

    pub fn data_root(&self) -> &Path {
        &self.config.data_root
    }

    pub fn table_dir(&self) -> PathBuf {
        self.config
            .data_root
            .join(&self.config.keyspace)
            .join(&self.config.table)
    }

    pub fn peer_host(&self) -> &str {
        &self.config.peer_host
    }

    pub fn peer_port(&self) -> u16 {
        self.config.peer_port
    }

    pub fn connect_timeout(&self) -> Duration {
        self.config.connect_timeout
    }

    pub fn request_timeout(&self) -> Duration {
        self.config.request_timeout
    }

    pub fn compaction_drain_timeout(&self) -> Duration {
        self.config.compaction_drain_timeout
    }

    pub fn keep_source(&self) -> bool {
        self.config.keep_source
    }

    pub fn debug(&self) -> bool {
        self.config.debug
    }

    pub fn current_version(&self) -> FormatVersion {
        self.config.current_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = UpgradeConfig::new("ks1", "events");
        assert_eq!(config.peer_host, "127.0.0.1");
        assert_eq!(config.peer_port, 9160);
        assert_eq!(config.data_root, PathBuf::from("./data"));
        assert!(!config.keep_source);
        assert_eq!(config.current_version, FormatVersion::CURRENT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_names_the_filename_grammar_cannot_hold() {
        assert!(UpgradeConfig::new("", "events").validate().is_err());
        assert!(UpgradeConfig::new("ks1", "").validate().is_err());
        assert!(UpgradeConfig::new("ks-1", "events").validate().is_err());
        assert!(UpgradeConfig::new("ks1", "ev.ents").validate().is_err());
        assert!(UpgradeConfig::new("ks_1", "events_2").validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_port() {
        let config = UpgradeConfig::new("ks1", "events").with_peer("127.0.0.1", 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_initialize_requires_data_root() {
        let missing = UpgradeConfig::new("ks1", "events").with_data_root("/no/such/root");
        assert!(matches!(
            RuntimeContext::initialize(missing),
            Err(StoreError::Config(_))
        ));

        let root = TempDir::new().unwrap();
        let config = UpgradeConfig::new("ks1", "events").with_data_root(root.path());
        let ctx = RuntimeContext::initialize(config).unwrap();
        assert_eq!(ctx.table_dir(), root.path().join("ks1").join("events"));
    }

    #[test]
    fn test_context_resolves_table_dir() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("ks1/events")).unwrap();
        let ctx = RuntimeContext::initialize(
            UpgradeConfig::new("ks1", "events").with_data_root(root.path()),
        )
        .unwrap();
        assert!(ctx.table_dir().ends_with("ks1/events"));
        assert_eq!(ctx.peer_port(), 9160);
    }
}
