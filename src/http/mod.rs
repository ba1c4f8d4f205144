//! HTTP protocol layer module
//!
//! Response builders and Content-Type helpers, decoupled from the proxy's
//! resolution logic.

pub mod mime;
pub mod response;

// Re-export commonly used types
pub use response::{
    build_404_response, build_500_response, build_health_response, build_status_response,
    build_stream_response, empty_body, full_body, ProxyBody,
};
