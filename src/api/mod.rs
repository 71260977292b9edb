//! Mapas API Server module
//!
//! HTTP boundary over the importer, the exporter and the store.
//! Run with `mapas serve` or `mapas-server`.

pub mod handlers;
pub mod server;

pub use server::{build_router, run_api_server, ApiConfig, AppState};
