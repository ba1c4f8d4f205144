//! Request handler module
//!
//! Embedding-server side of request processing: health probes, mount
//! prefix handling and access logging around the blob proxy.

pub mod router;

// Re-export main entry point
pub use router::handle_request;
