use crate::schema::TableMetadata;
use serde::{Deserialize, Serialize};

/// Requests a client may send over a schema connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchemaRequest {
    TableMetadata { keyspace: String, table: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchemaResponse {
    TableMetadata(TableMetadata),
    NotFound { keyspace: String, table: String },
    Error(String),
}
