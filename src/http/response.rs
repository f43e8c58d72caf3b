//! Response handling and transformation.
//!
//! # Responsibilities
//! - Abstract response produced by the dispatcher (status, headers, body)
//! - Convenience constructors for the common cases
//! - Conversion to an axum response at the transport edge
//!
//! # Design Decisions
//! - The not-found response is the dispatcher's default and fallback
//! - Cheap to clone (`Bytes` body), so a best-effort copy can be kept

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// 404 with an empty body.
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))
            .with_body(body.into())
    }

    pub fn html(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"))
            .with_body(body.into())
    }

    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        Self::new(status)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(value.to_string())
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Copy headers from `other` whose names this response does not set.
    pub fn merge_missing_headers(&mut self, other: &HeaderMap) {
        for name in other.keys() {
            if self.headers.contains_key(name) {
                continue;
            }
            for value in other.get_all(name) {
                self.headers.append(name.clone(), value.clone());
            }
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::not_found()
    }
}

impl axum::response::IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
