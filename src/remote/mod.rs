pub mod codec;
pub mod client;
pub mod protocol;
pub mod server;

pub use client::SchemaClient;
pub use protocol::{SchemaRequest, SchemaResponse};
pub use server::{RunningSchemaServer, SchemaCatalog, SchemaServer};
