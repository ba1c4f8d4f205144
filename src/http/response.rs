//! HTTP response building module
//!
//! Builders for the handful of response shapes the proxy and its
//! embedding server produce. Every response shares the [`ProxyBody`] type
//! so empty, buffered and streamed bodies can flow through one service.

use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use std::convert::Infallible;

/// Response body type shared by every handler
pub type ProxyBody = UnsyncBoxBody<Bytes, Infallible>;

pub fn empty_body() -> ProxyBody {
    Empty::<Bytes>::new().boxed_unsync()
}

pub fn full_body(data: impl Into<Bytes>) -> ProxyBody {
    Full::new(data.into()).boxed_unsync()
}

/// Build a bare status response: no body, no Content-Type
pub fn build_status_response(status: StatusCode) -> Response<ProxyBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = status;
    response
}

/// Build bare 404 Not Found response
pub fn build_404_response() -> Response<ProxyBody> {
    build_status_response(StatusCode::NOT_FOUND)
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<ProxyBody> {
    build_status_response(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Build 200 response around an already-streaming body
///
/// A Content-Type the store reported but that is not a legal header value
/// is dropped rather than failing the response.
pub fn build_stream_response(content_type: &str, body: ProxyBody) -> Response<ProxyBody> {
    let mut response = Response::new(body);
    match HeaderValue::from_str(content_type) {
        Ok(value) => {
            response.headers_mut().insert(CONTENT_TYPE, value);
        }
        Err(e) => {
            crate::logger::log_warning(&format!(
                "Dropping invalid Content-Type '{content_type}': {e}"
            ));
        }
    }
    response
}

/// Build health check response
pub fn build_health_response(status: &'static str) -> Response<ProxyBody> {
    let mut response = Response::new(full_body(status));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
