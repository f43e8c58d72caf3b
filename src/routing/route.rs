//! Route definitions and pattern syntax.
//!
//! # Responsibilities
//! - Describe a registered route (pattern, middleware ids, handler id, metadata)
//! - Split patterns and paths into segments consistently
//! - Compute the canonical key used to detect structurally identical patterns
//! - Capture the path segments matched by wildcards

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FrameworkError;

/// Separator and wildcard token shared by patterns and request paths.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PatternSyntax {
    pub separator: String,
    pub wildcard: String,
}

impl Default for PatternSyntax {
    fn default() -> Self {
        Self {
            separator: "/".to_string(),
            wildcard: "%".to_string(),
        }
    }
}

impl PatternSyntax {
    pub fn new(separator: impl Into<String>, wildcard: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            wildcard: wildcard.into(),
        }
    }

    /// Split into segments, discarding empty leading/trailing segments.
    ///
    /// `"/"` and `""` both yield zero segments. Interior empty segments
    /// (`"a//b"`) are kept as empty literals.
    pub fn split<'a>(&self, input: &'a str) -> Vec<&'a str> {
        let trimmed = input
            .trim_start_matches(self.separator.as_str())
            .trim_end_matches(self.separator.as_str());
        if trimmed.is_empty() {
            return Vec::new();
        }
        trimmed.split(self.separator.as_str()).collect()
    }

    pub fn is_wildcard(&self, segment: &str) -> bool {
        segment == self.wildcard
    }

    /// Canonical form of a pattern: literals lowercased, wildcards kept.
    ///
    /// Two patterns are structurally identical exactly when their canonical
    /// forms are equal.
    pub fn canonical(&self, pattern: &str) -> String {
        self.split(pattern)
            .into_iter()
            .map(|segment| {
                if self.is_wildcard(segment) {
                    segment.to_string()
                } else {
                    segment.to_lowercase()
                }
            })
            .collect::<Vec<_>>()
            .join(&self.separator)
    }

    /// Path segments sitting at wildcard positions of `pattern`.
    ///
    /// Callers must only pass a path the pattern already matched.
    pub fn capture(&self, pattern: &str, path: &str) -> Vec<String> {
        self.split(pattern)
            .into_iter()
            .zip(self.split(path))
            .filter(|(segment, _)| self.is_wildcard(segment))
            .map(|(_, value)| value.to_string())
            .collect()
    }
}

/// A registered route.
///
/// Owned by the route table behind an `Arc`; each dispatch works on its own
/// clone so `params` never leaks between requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    /// Pattern as registered (original spelling).
    pub pattern: String,

    /// Identifier of the request handler at the end of the chain.
    pub handler: String,

    /// Middleware identifiers, outermost first.
    pub middlewares: Vec<String>,

    /// Arbitrary per-route metadata (e.g. allowed methods).
    pub metadata: Map<String, Value>,

    /// Values captured by wildcard segments for the current request.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
}

impl Route {
    /// Create a route. The pattern must not be empty; `"/"` is the root.
    pub fn new(pattern: impl Into<String>, handler: impl Into<String>) -> Result<Self, FrameworkError> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(FrameworkError::InvalidPattern {
                pattern,
                reason: "pattern is empty",
            });
        }
        let handler = handler.into();
        if handler.is_empty() {
            return Err(FrameworkError::InvalidPattern {
                pattern,
                reason: "handler identifier is empty",
            });
        }

        Ok(Self {
            pattern,
            handler,
            middlewares: Vec::new(),
            metadata: Map::new(),
            params: Vec::new(),
        })
    }

    pub fn with_middleware(mut self, id: impl Into<String>) -> Self {
        self.middlewares.push(id.into());
        self
    }

    pub fn with_middlewares<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.middlewares.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}
