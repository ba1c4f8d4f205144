//! Serve static content out of a blob storage container over HTTP.
//!
//! [`proxy::BlobProxy`] is the handler: it maps a request path to an object
//! key, streams the object back, and falls back to configured index and
//! not-found documents. [`store::BlobStore`] is the storage seam, with an
//! `object_store`-backed implementation for Azure Blob Storage and local
//! directories. The `handler` and `server` modules embed the proxy in a
//! small hyper server.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod proxy;
pub mod server;
pub mod store;
