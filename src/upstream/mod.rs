pub mod client;
pub mod endpoints;
pub mod ingest;
pub mod schema;

pub use client::ResilientClient;
pub use endpoints::Endpoint;
