//! `BlobStore` backed by the `object_store` crate
//!
//! Covers Azure Blob Storage for production, a local directory for
//! development, and any other `ObjectStore` (tests use `InMemory`).

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use hyper::StatusCode;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::{Attribute, BackoffConfig, GetOptions, GetRange, ObjectStore, RetryConfig};
use std::future::Future;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{
    BlobDownload, BlobStore, BlobStream, FetchError, FetchRequest, RetryReaderOptions,
    ServiceCode, StoreError,
};
use crate::config::{LoadError, RetryPolicyConfig, StorageConfig, StorageKind};
use crate::http::mime;
use crate::logger;

type ChunkStream = BoxStream<'static, object_store::Result<Bytes>>;

/// Blob store client shared by every request
pub struct ObjectStoreBlobStore {
    store: Arc<dyn ObjectStore>,
    md5_warned: AtomicBool,
}

impl ObjectStoreBlobStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            md5_warned: AtomicBool::new(false),
        }
    }

    /// Build the client described by the `[storage]` section
    pub fn from_config(config: &StorageConfig) -> Result<Self, LoadError> {
        let store: Arc<dyn ObjectStore> = match config.kind {
            StorageKind::Azure => Arc::new(build_azure(config)?),
            StorageKind::Local => {
                let root = config.local_root.as_deref().ok_or_else(|| {
                    LoadError::Storage("storage.local_root is required for kind = \"local\"".into())
                })?;
                let fs = LocalFileSystem::new_with_prefix(root)
                    .map_err(|e| LoadError::Storage(format!("local root '{root}': {e}")))?;
                Arc::new(fs)
            }
        };
        Ok(Self::new(store))
    }

    fn warn_md5_unsupported(&self) {
        if !self.md5_warned.swap(true, Ordering::Relaxed) {
            logger::log_warning(
                "range_get_content_md5 is set but the object_store client cannot request \
                 range checksums; reads proceed without them",
            );
        }
    }

    /// Work out whether a failed ranged read failed because of its range
    ///
    /// An empty object satisfies no range, including one starting at 0.
    async fn classify_range_failure(
        &self,
        path: &Path,
        request: &FetchRequest<'_>,
    ) -> Option<StoreError> {
        byte_range(request.offset, request.count)?;
        let meta = self.store.head(path).await.ok()?;
        (request.offset >= meta.size).then(|| {
            StoreError::new(
                StatusCode::RANGE_NOT_SATISFIABLE,
                ServiceCode::InvalidRange,
                format!(
                    "offset {} is beyond the end of {} ({} bytes)",
                    request.offset, request.key, meta.size
                ),
            )
        })
    }
}

fn build_azure(config: &StorageConfig) -> Result<object_store::azure::MicrosoftAzure, LoadError> {
    let required = |value: &Option<String>, name: &str| {
        value.clone().filter(|v| !v.is_empty()).ok_or_else(|| {
            LoadError::Storage(format!("storage.{name} is required for kind = \"azure\""))
        })
    };

    let mut builder = MicrosoftAzureBuilder::new()
        .with_account(required(&config.account_name, "account_name")?)
        .with_access_key(required(&config.account_key, "account_key")?)
        .with_container_name(required(&config.container_name, "container_name")?)
        .with_retry(retry_config(&config.retry));

    // For supporting Azurite for testing
    if let Some(endpoint) = config.endpoint.clone().filter(|e| !e.is_empty()) {
        if endpoint.starts_with("http://") {
            builder = builder.with_allow_http(true);
        }
        builder = builder.with_endpoint(endpoint);
    }

    builder
        .build()
        .map_err(|e| LoadError::Storage(format!("azure client: {e}")))
}

/// Map the configured retry policy onto the client's own retry loop
pub fn retry_config(policy: &RetryPolicyConfig) -> RetryConfig {
    RetryConfig {
        backoff: BackoffConfig {
            init_backoff: Duration::from_millis(policy.init_backoff_ms),
            max_backoff: Duration::from_millis(policy.max_backoff_ms),
            base: policy.backoff_base,
        },
        max_retries: policy.max_retries,
        retry_timeout: Duration::from_secs(policy.retry_timeout_secs),
    }
}

/// Byte range for an offset/count pair, where count 0 means "to the end"
pub fn byte_range(offset: u64, count: u64) -> Option<GetRange> {
    match (offset, count) {
        (0, 0) => None,
        (offset, 0) => Some(GetRange::Offset(offset)),
        (offset, count) => Some(GetRange::Bounded(offset..offset.saturating_add(count))),
    }
}

fn get_options(request: &FetchRequest<'_>) -> GetOptions {
    let conditions = request.access_conditions;
    GetOptions {
        if_match: conditions.if_match.clone(),
        if_none_match: conditions.if_none_match.clone(),
        if_modified_since: conditions.if_modified_since,
        if_unmodified_since: conditions.if_unmodified_since,
        range: byte_range(request.offset, request.count),
        ..GetOptions::default()
    }
}

/// Object path for a key, exactly as requested
///
/// `Path` drops leading, trailing and repeated `/`, so a key using them
/// names an object no container holds and is reported as not found rather
/// than silently mapped onto a neighbouring object.
fn object_path(key: &str) -> Result<Path, StoreError> {
    match Path::parse(key) {
        Ok(path) if AsRef::<str>::as_ref(&path) == key => Ok(path),
        Ok(_) => Err(StoreError::not_found(key)),
        Err(_) if key.split('/').any(str::is_empty) => Err(StoreError::not_found(key)),
        Err(e) => Err(StoreError::new(
            StatusCode::BAD_REQUEST,
            ServiceCode::InvalidResourceName,
            format!("invalid blob name '{key}': {e}"),
        )),
    }
}

/// Translate a client error into the fetch taxonomy
///
/// Returns the error back when it carries no classification.
fn classify(err: object_store::Error) -> Result<StoreError, object_store::Error> {
    use object_store::Error;

    let classified = match err {
        Error::NotFound { ref path, .. } => StoreError::not_found(path),
        Error::Precondition { ref source, .. } => StoreError::new(
            StatusCode::PRECONDITION_FAILED,
            ServiceCode::ConditionNotMet,
            source.to_string(),
        ),
        Error::NotModified { ref source, .. } => StoreError::new(
            StatusCode::NOT_MODIFIED,
            ServiceCode::ConditionNotMet,
            source.to_string(),
        ),
        Error::PermissionDenied { ref source, .. } => StoreError::new(
            StatusCode::FORBIDDEN,
            ServiceCode::AuthorizationFailure,
            source.to_string(),
        ),
        Error::Unauthenticated { ref source, .. } => StoreError::new(
            StatusCode::UNAUTHORIZED,
            ServiceCode::AuthenticationFailed,
            source.to_string(),
        ),
        other => return Err(other),
    };
    Ok(classified)
}

#[async_trait]
impl BlobStore for ObjectStoreBlobStore {
    async fn fetch(&self, request: FetchRequest<'_>) -> Result<BlobDownload, FetchError> {
        if request.range_get_content_md5 {
            self.warn_md5_unsupported();
        }

        let path = object_path(request.key)?;

        let result = match self.store.get_opts(&path, get_options(&request)).await {
            Ok(result) => result,
            Err(err) => {
                return Err(match classify(err) {
                    Ok(store_err) => store_err.into(),
                    Err(other) => match self.classify_range_failure(&path, &request).await {
                        Some(store_err) => store_err.into(),
                        None => FetchError::unexpected(other),
                    },
                });
            }
        };

        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map_or_else(
                || mime::guess_content_type(request.key).to_string(),
                |v| AsRef::<str>::as_ref(v).to_owned(),
            );
        let span = result.range.clone();
        let etag = result.meta.e_tag.clone();

        let key = request.key.to_string();
        let store = Arc::clone(&self.store);
        let pinned_etag = etag.clone();
        let initial = result.into_stream();

        Ok(BlobDownload::new(
            content_type,
            Some(span.end - span.start),
            etag,
            move |options| {
                resumable_body(key, initial, span, options, move |remaining| {
                    let store = Arc::clone(&store);
                    let path = path.clone();
                    let options = GetOptions {
                        if_match: pinned_etag.clone(),
                        range: Some(GetRange::Bounded(remaining)),
                        ..GetOptions::default()
                    };
                    async move { store.get_opts(&path, options).await.map(|r| r.into_stream()) }
                })
            },
        ))
    }
}

struct ResumeState<F> {
    key: String,
    inner: ChunkStream,
    next: u64,
    end: u64,
    retries_left: u32,
    reopen: F,
}

/// Body stream that re-reads from the first missing byte after a failure
///
/// Each resumption costs one of `max_retry_requests`; once they run out the
/// failure is passed on and the stream ends.
fn resumable_body<F, Fut>(
    key: String,
    initial: ChunkStream,
    span: Range<u64>,
    options: RetryReaderOptions,
    reopen: F,
) -> BlobStream
where
    F: FnMut(Range<u64>) -> Fut + Send + 'static,
    Fut: Future<Output = object_store::Result<ChunkStream>> + Send + 'static,
{
    let state = ResumeState {
        key,
        inner: initial,
        next: span.start,
        end: span.end,
        retries_left: options.max_retry_requests,
        reopen,
    };

    futures::stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        loop {
            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    state.next += chunk.len() as u64;
                    return Some((Ok(chunk), Some(state)));
                }
                None => return None,
                Some(Err(err)) => {
                    if state.retries_left == 0 || state.next >= state.end {
                        return Some((Err(std::io::Error::other(err)), None));
                    }
                    state.retries_left -= 1;
                    logger::log_warning(&format!(
                        "Resuming read of '{}' at byte {} after: {err}",
                        state.key, state.next
                    ));
                    match (state.reopen)(state.next..state.end).await {
                        Ok(stream) => state.inner = stream,
                        Err(e) => return Some((Err(std::io::Error::other(e)), None)),
                    }
                }
            }
        }
    })
    .boxed()
}
