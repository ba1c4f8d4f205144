//! Blob proxy handler
//!
//! Turns one HTTP request into one HTTP response by reading an object out
//! of a [`BlobStore`]:
//!
//! 1. The request path minus its leading `/` is the object key; an empty
//!    key becomes the index document when one is configured.
//! 2. The key is fetched. A missing object falls back to the not-found
//!    document (if configured), fetched once and never recursively.
//! 3. A fetched object is answered with its store-reported Content-Type
//!    and its body streamed through unbuffered.
//! 4. Classified store errors keep their status code; anything else is a
//!    500. Neither carries a body.
//!
//! The handler holds no per-request state and never returns an error.

use futures::StreamExt;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::{parse_timestamp, LoadError, ProxyConfig};
use crate::http::{self, ProxyBody};
use crate::logger;
use crate::store::{
    AccessConditions, BlobDownload, BlobStore, FetchError, FetchRequest, RetryReaderOptions,
};

/// Read-only settings applied to every request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyOptions {
    pub offset: u64,
    /// 0 reads to the end of the object
    pub count: u64,
    pub access_conditions: AccessConditions,
    pub range_get_content_md5: bool,
    pub retry_reader: RetryReaderOptions,
    /// Key served for an empty path; empty disables
    pub index_document_name: String,
    /// Key served when the requested object is missing; empty disables
    pub not_found_document_path: String,
}

impl ProxyOptions {
    pub fn from_config(config: &ProxyConfig) -> Result<Self, LoadError> {
        Ok(Self {
            offset: config.offset,
            count: config.count,
            access_conditions: AccessConditions {
                if_match: config.if_match.clone().filter(|v| !v.is_empty()),
                if_none_match: config.if_none_match.clone().filter(|v| !v.is_empty()),
                if_modified_since: parse_timestamp(
                    "proxy.if_modified_since",
                    config.if_modified_since.as_deref(),
                )?,
                if_unmodified_since: parse_timestamp(
                    "proxy.if_unmodified_since",
                    config.if_unmodified_since.as_deref(),
                )?,
            },
            range_get_content_md5: config.range_get_content_md5,
            retry_reader: config.retry_reader.into(),
            index_document_name: config.index_document_name.clone(),
            not_found_document_path: config.not_found_document_path.clone(),
        })
    }
}

/// Marker attached to successful responses, read back for access logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedObject {
    pub key: String,
    pub content_length: Option<u64>,
}

/// HTTP handler serving objects from a blob store
pub struct BlobProxy {
    store: Arc<dyn BlobStore>,
    options: ProxyOptions,
}

impl BlobProxy {
    pub fn new(store: Arc<dyn BlobStore>, options: ProxyOptions) -> Self {
        Self { store, options }
    }

    /// Whole objects, no index or not-found documents
    pub fn simple(store: Arc<dyn BlobStore>) -> Self {
        Self::new(store, ProxyOptions::default())
    }

    pub const fn options(&self) -> &ProxyOptions {
        &self.options
    }

    /// Object key for a request path
    pub fn resolve_key<'a>(&'a self, path: &'a str) -> &'a str {
        let key = path.strip_prefix('/').unwrap_or(path);
        if key.is_empty() && !self.options.index_document_name.is_empty() {
            &self.options.index_document_name
        } else {
            key
        }
    }

    /// Serve a request; only its path is consulted
    pub async fn handle<B>(&self, req: &Request<B>) -> Response<ProxyBody> {
        self.serve_path(req.uri().path()).await
    }

    /// Serve a path that has already had any mount prefix removed
    pub async fn serve_path(&self, path: &str) -> Response<ProxyBody> {
        let key = self.resolve_key(path);
        match self.download(key).await {
            Ok(download) => self.copy_resp(key, download),
            Err(FetchError::Store(err)) if err.is_not_found() => self.try_not_found().await,
            Err(FetchError::Store(err)) => {
                logger::log_blob_download_error(key, &err);
                http::build_status_response(err.status)
            }
            Err(FetchError::Unexpected(err)) => Self::handle_unexpected_error(key, &*err),
        }
    }

    async fn try_not_found(&self) -> Response<ProxyBody> {
        let key = self.options.not_found_document_path.as_str();
        if key.is_empty() {
            return http::build_404_response();
        }

        match self.download(key).await {
            Ok(download) => self.copy_resp(key, download),
            Err(FetchError::Store(err)) if err.is_not_found() => http::build_404_response(),
            Err(FetchError::Store(err)) => {
                logger::log_blob_download_error(key, &err);
                http::build_status_response(err.status)
            }
            Err(FetchError::Unexpected(err)) => Self::handle_unexpected_error(key, &*err),
        }
    }

    async fn download(&self, key: &str) -> Result<BlobDownload, FetchError> {
        self.store
            .fetch(FetchRequest {
                key,
                offset: self.options.offset,
                count: self.options.count,
                access_conditions: &self.options.access_conditions,
                range_get_content_md5: self.options.range_get_content_md5,
            })
            .await
    }

    fn handle_unexpected_error(
        key: &str,
        err: &(dyn std::error::Error + Send + Sync),
    ) -> Response<ProxyBody> {
        logger::log_unexpected_error(key, &err);
        http::build_500_response()
    }

    /// Stream a fetched object out as a 200
    ///
    /// Headers are committed before the first chunk, so a failed chunk can
    /// only be logged; the body simply ends there.
    fn copy_resp(&self, key: &str, download: BlobDownload) -> Response<ProxyBody> {
        let content_type = download.content_type.clone();
        let served = ServedObject {
            key: key.to_string(),
            content_length: download.content_length,
        };

        let log_key = served.key.clone();
        let frames = download
            .into_body(self.options.retry_reader)
            .scan(0_u64, move |sent, chunk| {
                let frame = match chunk {
                    Ok(data) => {
                        *sent += data.len() as u64;
                        Some(Ok::<_, Infallible>(Frame::data(data)))
                    }
                    Err(err) => {
                        logger::log_copy_error(&log_key, *sent, &err);
                        None
                    }
                };
                futures::future::ready(frame)
            });

        let mut response =
            http::build_stream_response(&content_type, StreamBody::new(frames).boxed_unsync());
        response.extensions_mut().insert(served);
        response
    }
}
