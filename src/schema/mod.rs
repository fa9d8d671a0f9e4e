pub mod keyspace;
pub mod metadata;

pub use keyspace::{Keyspace, LocalReplication, TableHandle};
pub use metadata::TableMetadata;
