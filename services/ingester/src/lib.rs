//! Document text extraction service.
//!
//! Receives storage "object finalized" CloudEvents over HTTP and runs the
//! extraction pipeline from the `ingestion` crate for each of them.

pub mod config;
pub mod metrics;
pub mod server;

pub use config::IngesterConfig;
pub use server::{build_router, start_server, ServerState};
