use super::codec;
use super::protocol::{SchemaRequest, SchemaResponse};
use crate::core::{Result, StoreError};
use crate::schema::TableMetadata;
use log::debug;
use std::time::Duration;
use tokio::net::TcpStream;

/// One-shot schema connection to a running peer. Used exactly once per
/// upgrade run: connect, fetch, drop.
pub struct SchemaClient {
    stream: TcpStream,
    request_timeout: Duration,
}

impl SchemaClient {
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let attempt = TcpStream::connect((host, port));
        let stream = match tokio::time::timeout(connect_timeout, attempt).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(StoreError::Remote(format!(
                    "Failed to connect to schema peer {}:{}: {}",
                    host, port, e
                )));
            }
            Err(_) => {
                return Err(StoreError::Remote(format!(
                    "Timed out connecting to schema peer {}:{}",
                    host, port
                )));
            }
        };
        debug!("Connected to schema peer {}:{}", host, port);
        Ok(Self {
            stream,
            request_timeout,
        })
    }

    pub async fn fetch_table_metadata(
        &mut self,
        keyspace: &str,
        table: &str,
    ) -> Result<TableMetadata> {
        let request = SchemaRequest::TableMetadata {
            keyspace: keyspace.to_string(),
            table: table.to_string(),
        };
        codec::write_message(&mut self.stream, &request).await?;

        let read = codec::read_message::<_, SchemaResponse>(&mut self.stream);
        let response = match tokio::time::timeout(self.request_timeout, read).await {
            Ok(Ok(Some(response))) => response,
            Ok(Ok(None)) => {
                return Err(StoreError::Remote(
                    "Schema peer closed the connection before replying".to_string(),
                ));
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(StoreError::Remote(format!(
                    "Timed out waiting for metadata of {}.{}",
                    keyspace, table
                )));
            }
        };

        match response {
            SchemaResponse::TableMetadata(metadata) => {
                if metadata.keyspace != keyspace || metadata.table != table {
                    return Err(StoreError::Remote(format!(
                        "Peer answered with metadata for {} instead of {}.{}",
                        metadata.qualified_name(),
                        keyspace,
                        table
                    )));
                }
                debug!("Fetched table metadata for {}", metadata.qualified_name());
                Ok(metadata)
            }
            SchemaResponse::NotFound { keyspace, table } => {
                Err(StoreError::TableNotFound(keyspace, table))
            }
            SchemaResponse::Error(message) => Err(StoreError::Remote(format!(
                "Schema peer error: {}",
                message
            ))),
        }
    }
}
