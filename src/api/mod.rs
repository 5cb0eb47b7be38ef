//! HTTP API.
//!
//! Upload routes accept multipart bodies, run the extraction pipeline, and
//! answer with `{success, data?, error?}` JSON. Everything is mounted by
//! `api_router()`; `server` owns the listener lifecycle.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{serve, start_server, ApiServer, ServerSession, ServiceError};
pub use types::ApiContext;
