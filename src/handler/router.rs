//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: health probes first, then the
//! mount prefix is stripped and the remainder handed to the blob proxy.

use hyper::{Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{AppState, HealthConfig};
use crate::http::{self, ProxyBody};
use crate::logger::{self, AccessLogEntry};
use crate::proxy::ServedObject;

/// Main entry point for HTTP request handling
///
/// Any method is accepted; only the path is consulted.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<ProxyBody>, Infallible> {
    let started = Instant::now();
    let mut entry = access_entry(&req, remote_addr);
    drop(req);

    let response = route_request(&entry.path, &state).await;

    if state.config.logging.access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .extensions()
            .get::<ServedObject>()
            .and_then(|served| served.content_length);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn route_request(path: &str, state: &AppState) -> Response<ProxyBody> {
    if let Some(resp) = check_health(path, &state.config.health) {
        return resp;
    }

    match strip_mount_prefix(&state.config.server.mount_path, path) {
        Some(rest) => state.proxy.serve_path(rest).await,
        None => http::build_404_response(),
    }
}

/// Health check endpoints answer before the mount prefix is considered
fn check_health(path: &str, health: &HealthConfig) -> Option<Response<ProxyBody>> {
    if !health.enabled {
        return None;
    }
    if path == health.liveness_path || path == health.readiness_path {
        return Some(http::build_health_response("ok"));
    }
    None
}

/// Remainder of `path` under `mount`, still starting with `/`
///
/// `None` when the path lies outside the mount. The mount itself maps to
/// an empty remainder so the proxy can apply its index document.
pub fn strip_mount_prefix<'a>(mount: &str, path: &'a str) -> Option<&'a str> {
    let mount = mount.trim_end_matches('/');
    if mount.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(mount)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

fn access_entry<B>(req: &Request<B>, remote_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: hyper::header::HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = match req.version() {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    }
    .to_string();
    entry.referer = header(hyper::header::REFERER);
    entry.user_agent = header(hyper::header::USER_AGENT);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        Config, LoggingConfig, PerformanceConfig, ProxyConfig, RetryPolicyConfig, ServerConfig,
        StorageConfig, StorageKind,
    };
    use crate::proxy::{BlobProxy, ProxyOptions};
    use crate::store::ObjectStoreBlobStore;
    use http_body_util::BodyExt;
    use hyper::StatusCode;
    use object_store::memory::InMemory;
    use object_store::path::Path;
    use object_store::{ObjectStore, PutPayload};

    fn test_config(mount_path: &str) -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                workers: None,
                mount_path: mount_path.to_string(),
            },
            logging: LoggingConfig {
                level: "error".to_string(),
                access_log: false,
                access_log_format: "combined".to_string(),
                access_log_file: None,
                error_log_file: None,
            },
            performance: PerformanceConfig {
                keep_alive_timeout: 75,
                read_timeout: 30,
                write_timeout: 30,
                max_connections: None,
            },
            health: HealthConfig::default(),
            storage: StorageConfig {
                kind: StorageKind::Local,
                account_name: None,
                account_key: None,
                container_name: None,
                endpoint: None,
                local_root: None,
                retry: RetryPolicyConfig::default(),
            },
            proxy: ProxyConfig::default(),
        }
    }

    async fn state(mount_path: &str) -> Arc<AppState> {
        let memory = Arc::new(InMemory::new());
        memory
            .put(&Path::from("index.html"), PutPayload::from_static(b"<h1>home</h1>"))
            .await
            .unwrap();
        memory
            .put(&Path::from("css/site.css"), PutPayload::from_static(b"body{}"))
            .await
            .unwrap();

        let store = Arc::new(ObjectStoreBlobStore::new(memory));
        let options = ProxyOptions {
            index_document_name: "index.html".to_string(),
            ..ProxyOptions::default()
        };
        Arc::new(AppState::new(
            test_config(mount_path),
            BlobProxy::new(store, options),
        ))
    }

    async fn get(state: &Arc<AppState>, uri: &str) -> Response<ProxyBody> {
        let req = Request::get(uri).body(()).unwrap();
        let addr: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        handle_request(req, Arc::clone(state), addr).await.unwrap()
    }

    #[test]
    fn test_strip_mount_prefix() {
        assert_eq!(strip_mount_prefix("/", "/a/b.css"), Some("/a/b.css"));
        assert_eq!(strip_mount_prefix("", "/"), Some("/"));
        assert_eq!(strip_mount_prefix("/static", "/static/a.js"), Some("/a.js"));
        assert_eq!(strip_mount_prefix("/static/", "/static/a.js"), Some("/a.js"));
        assert_eq!(strip_mount_prefix("/static", "/static"), Some(""));
        assert_eq!(strip_mount_prefix("/static", "/static/"), Some("/"));
        assert_eq!(strip_mount_prefix("/static", "/staticfiles/a.js"), None);
        assert_eq!(strip_mount_prefix("/static", "/other/a.js"), None);
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let state = state("/static").await;
        for path in ["/healthz", "/readyz"] {
            let resp = get(&state, path).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let body = resp.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(&body[..], b"ok");
        }
    }

    #[tokio::test]
    async fn test_disabled_health_falls_through_to_proxy() {
        let memory = Arc::new(InMemory::new());
        let mut config = test_config("/");
        config.health.enabled = false;
        let state = Arc::new(AppState::new(
            config,
            BlobProxy::simple(Arc::new(ObjectStoreBlobStore::new(memory))),
        ));
        let resp = get(&state, "/healthz").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_mounted_proxy_serves_objects() {
        let state = state("/static").await;

        let resp = get(&state, "/static/css/site.css").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.extensions().get::<ServedObject>().is_some());
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"body{}");

        let resp = get(&state, "/static").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"<h1>home</h1>");
    }

    #[tokio::test]
    async fn test_outside_mount_is_404() {
        let state = state("/static").await;
        let resp = get(&state, "/css/site.css").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(resp.extensions().get::<ServedObject>().is_none());
    }

    #[test]
    fn test_access_entry_from_request() {
        let req = Request::post("/static/app.js?v=2")
            .header("user-agent", "curl/8.0")
            .header("referer", "https://example.com/")
            .body(())
            .unwrap();
        let entry = access_entry(&req, "192.168.1.9:443".parse().unwrap());
        assert_eq!(entry.remote_addr, "192.168.1.9");
        assert_eq!(entry.method, "POST");
        assert_eq!(entry.path, "/static/app.js");
        assert_eq!(entry.query.as_deref(), Some("v=2"));
        assert_eq!(entry.http_version, "1.1");
        assert_eq!(entry.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(entry.referer.as_deref(), Some("https://example.com/"));
    }
}
