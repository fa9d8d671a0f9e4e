use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Remote schema error: {0}")]
    Remote(String),

    #[error("Table '{0}.{1}' not found")]
    TableNotFound(String, String),

    #[error("Unsupported partitioner '{0}'")]
    UnsupportedPartitioner(String),

    #[error("Unknown format version '{0}'")]
    UnknownVersion(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Corrupt sstable component: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Maintenance error: {0}")]
    Maintenance(String),

    #[error("Lock error: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}
