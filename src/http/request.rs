//! Request handling and transformation.
//!
//! # Responsibilities
//! - Hold the already-parsed request the dispatcher works on
//! - Parse cookies out of the `Cookie` header
//! - Carry per-request data attached by listeners and middleware (extensions)
//!
//! # Design Decisions
//! - Transport independent: built by the server adapter, or directly in tests
//! - Uses the `http` types re-exported by axum for method and headers

use std::collections::HashMap;

use axum::body::Bytes;
use axum::http::{header, Extensions, HeaderMap, HeaderName, HeaderValue, Method};

/// An incoming request as seen by the dispatcher.
#[derive(Debug, Default)]
pub struct Request {
    pub method: Method,
    /// Path component only; no query string.
    pub path: String,
    pub headers: HeaderMap,
    pub cookies: HashMap<String, String>,
    pub body: Bytes,
    /// Typed data attached during dispatch (session, listener payloads).
    pub extensions: Extensions,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Self::default()
        }
    }

    /// Build from transport parts; cookies are parsed from `headers`.
    pub fn from_parts(method: Method, path: impl Into<String>, headers: HeaderMap, body: Bytes) -> Self {
        let cookies = parse_cookies(&headers);
        Self {
            method,
            path: path.into(),
            headers,
            cookies,
            body,
            extensions: Extensions::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// Collect `name=value` pairs from every `Cookie` header.
///
/// Malformed pairs are skipped; for repeated names the first one wins.
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for value in headers.get_all(header::COOKIE) {
        let Ok(raw) = value.to_str() else {
            continue;
        };
        for pair in raw.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                cookies
                    .entry(name.to_string())
                    .or_insert_with(|| value.trim().trim_matches('"').to_string());
            }
        }
    }
    cookies
}
