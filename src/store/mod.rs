//! Blob store module
//!
//! The seam between the proxy and whatever holds the objects. The proxy
//! only needs one capability, [`BlobStore::fetch`], and a classified result
//! it can match on; authentication, connection pooling and retries belong
//! to the implementation behind the trait.

pub mod object;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use hyper::StatusCode;
use std::fmt;

use crate::config::RetryReaderConfig;

pub use object::ObjectStoreBlobStore;

/// Object body as a stream of chunks
pub type BlobStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// Conditional-read parameters forwarded verbatim on every fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessConditions {
    pub if_match: Option<String>,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<DateTime<Utc>>,
    pub if_unmodified_since: Option<DateTime<Utc>>,
}

/// How many times a dropped body read may be resumed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryReaderOptions {
    pub max_retry_requests: u32,
}

impl From<RetryReaderConfig> for RetryReaderOptions {
    fn from(config: RetryReaderConfig) -> Self {
        Self {
            max_retry_requests: config.max_retry_requests,
        }
    }
}

/// One object read
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub key: &'a str,
    pub offset: u64,
    /// 0 reads to the end of the object
    pub count: u64,
    pub access_conditions: &'a AccessConditions,
    pub range_get_content_md5: bool,
}

/// Store-specific classification of a failed read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCode {
    BlobNotFound,
    ConditionNotMet,
    AuthenticationFailed,
    AuthorizationFailure,
    InvalidRange,
    InvalidResourceName,
    Other(String),
}

impl fmt::Display for ServiceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlobNotFound => f.write_str("BlobNotFound"),
            Self::ConditionNotMet => f.write_str("ConditionNotMet"),
            Self::AuthenticationFailed => f.write_str("AuthenticationFailed"),
            Self::AuthorizationFailure => f.write_str("AuthorizationFailure"),
            Self::InvalidRange => f.write_str("InvalidRange"),
            Self::InvalidResourceName => f.write_str("InvalidResourceName"),
            Self::Other(code) => f.write_str(code),
        }
    }
}

/// A failure the store classified, with the HTTP status it maps to
#[derive(Debug, Clone, thiserror::Error)]
#[error("{} {code}: {message}", .status.as_u16())]
pub struct StoreError {
    pub status: StatusCode,
    pub code: ServiceCode,
    pub message: String,
}

impl StoreError {
    pub fn new(status: StatusCode, code: ServiceCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(key: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            ServiceCode::BlobNotFound,
            format!("the specified blob does not exist: {key}"),
        )
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ServiceCode::BlobNotFound
    }
}

/// Why a fetch produced no object
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Transport or protocol failure with no store classification
    #[error("{0}")]
    Unexpected(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl FetchError {
    pub fn unexpected(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Unexpected(err.into())
    }
}

type BodyFactory = Box<dyn FnOnce(RetryReaderOptions) -> BlobStream + Send>;

/// A successful fetch: metadata plus a body that has not been read yet
pub struct BlobDownload {
    pub content_type: String,
    pub content_length: Option<u64>,
    pub etag: Option<String>,
    body: BodyFactory,
}

impl BlobDownload {
    pub fn new(
        content_type: impl Into<String>,
        content_length: Option<u64>,
        etag: Option<String>,
        body: impl FnOnce(RetryReaderOptions) -> BlobStream + Send + 'static,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            content_length,
            etag,
            body: Box::new(body),
        }
    }

    /// Open the body, letting the store resume dropped reads per `options`
    pub fn into_body(self, options: RetryReaderOptions) -> BlobStream {
        (self.body)(options)
    }
}

impl fmt::Debug for BlobDownload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobDownload")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("etag", &self.etag)
            .finish_non_exhaustive()
    }
}

/// Read access to a container of objects
///
/// Implementations must be safe to share across concurrent requests.
/// Dropping the returned future abandons the read.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn fetch(&self, request: FetchRequest<'_>) -> Result<BlobDownload, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::not_found("missing.html");
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "404 BlobNotFound: the specified blob does not exist: missing.html"
        );

        let err = StoreError::new(
            StatusCode::FORBIDDEN,
            ServiceCode::Other("AccountIsDisabled".to_string()),
            "disabled",
        );
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "403 AccountIsDisabled: disabled");
    }

    #[test]
    fn test_fetch_error_from_store_error() {
        let err: FetchError = StoreError::not_found("a").into();
        assert!(matches!(err, FetchError::Store(ref e) if e.is_not_found()));

        let err = FetchError::unexpected("connection reset");
        assert_eq!(err.to_string(), "connection reset");
    }

    #[tokio::test]
    async fn test_download_body_receives_retry_options() {
        let download = BlobDownload::new("text/plain", Some(2), None, |options| {
            let marker = Bytes::from(options.max_retry_requests.to_string());
            futures::stream::iter(vec![Ok(marker)]).boxed()
        });
        assert_eq!(download.content_type, "text/plain");

        let mut body = download.into_body(RetryReaderOptions {
            max_retry_requests: 7,
        });
        let chunk = body.next().await.unwrap().unwrap();
        assert_eq!(chunk, Bytes::from_static(b"7"));
        assert!(body.next().await.is_none());
    }
}
