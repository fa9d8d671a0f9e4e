use super::codec;
use super::protocol::{SchemaRequest, SchemaResponse};
use crate::core::{Result, StoreError};
use crate::schema::TableMetadata;
use log::{debug, error, info};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Immutable registry of table definitions a schema server answers from.
/// Copy-on-write so clones shared into connection tasks are cheap.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    tables: Arc<HashMap<(String, String), TableMetadata>>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table definition, replacing any previous one for the same
    /// name. Returns a new catalog; the old one is untouched.
    pub fn with_table(self, metadata: TableMetadata) -> Self {
        let mut tables = (*self.tables).clone();
        tables.insert(
            (metadata.keyspace.clone(), metadata.table.clone()),
            metadata,
        );
        Self {
            tables: Arc::new(tables),
        }
    }

    pub fn get(&self, keyspace: &str, table: &str) -> Option<&TableMetadata> {
        self.tables
            .get(&(keyspace.to_string(), table.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Serving side of the schema protocol, the counterpart a peer node
/// exposes to bootstrapping upgrade runs.
pub struct SchemaServer {
    catalog: SchemaCatalog,
    host: String,
    port: u16,
}

impl SchemaServer {
    pub fn new(catalog: SchemaCatalog, host: &str, port: u16) -> Self {
        Self {
            catalog,
            host: host.to_string(),
            port,
        }
    }

    /// Bind and start accepting in a background task. Port 0 picks a free
    /// port; the bound address is available on the returned handle.
    pub async fn start(self) -> Result<RunningSchemaServer> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| StoreError::Remote(format!("Failed to bind '{}': {}", addr, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| StoreError::Remote(format!("Failed to resolve bound address: {}", e)))?;
        info!("Schema server listening on {}", local_addr);

        let catalog = self.catalog;
        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        debug!("Accepted schema connection from {}", peer);
                        let catalog = catalog.clone();
                        tokio::spawn(handle_connection(stream, peer, catalog));
                    }
                    Err(e) => {
                        error!("Failed to accept schema connection: {}", e);
                    }
                }
            }
        });

        Ok(RunningSchemaServer { local_addr, handle })
    }
}

pub struct RunningSchemaServer {
    local_addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl RunningSchemaServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for RunningSchemaServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, catalog: SchemaCatalog) {
    loop {
        let request = match codec::read_message::<_, SchemaRequest>(&mut stream).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!("Schema connection from {} closed", peer);
                return;
            }
            Err(e) => {
                error!("Schema connection from {} failed: {}", peer, e);
                return;
            }
        };
        let response = dispatch(&catalog, request);
        if let Err(e) = codec::write_message(&mut stream, &response).await {
            error!("Failed to answer {}: {}", peer, e);
            return;
        }
    }
}

fn dispatch(catalog: &SchemaCatalog, request: SchemaRequest) -> SchemaResponse {
    match request {
        SchemaRequest::TableMetadata { keyspace, table } => {
            match catalog.get(&keyspace, &table) {
                Some(metadata) => {
                    debug!("Serving table metadata for {}.{}", keyspace, table);
                    SchemaResponse::TableMetadata(metadata.clone())
                }
                None => SchemaResponse::NotFound { keyspace, table },
            }
        }
    }
}
