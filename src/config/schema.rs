//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the framework.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::routing::{CollisionPolicy, PatternSyntax};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Route pattern syntax and collision handling.
    pub routing: RoutingConfig,

    /// Session cookie settings.
    pub session: SessionConfig,

    /// Module selection and ordering.
    pub modules: ModulesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest request body accepted, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Route pattern settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RoutingConfig {
    /// Segment separator.
    pub separator: String,

    /// Token matching any single segment.
    pub wildcard: String,

    /// What to do when two patterns share a canonical form.
    pub collision_policy: CollisionPolicy,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        let syntax = PatternSyntax::default();
        Self {
            separator: syntax.separator,
            wildcard: syntax.wildcard,
            collision_policy: CollisionPolicy::default(),
        }
    }
}

impl RoutingConfig {
    pub fn syntax(&self) -> PatternSyntax {
        PatternSyntax::new(self.separator.clone(), self.wildcard.clone())
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Attach the session middleware to the index route.
    pub enabled: bool,

    /// Name of the cookie carrying the session id.
    pub cookie_name: String,

    /// Session lifetime in seconds.
    pub expiration_secs: u64,

    /// How often expired sessions are swept from memory while serving.
    pub cleanup_interval_secs: u64,

    /// Cookie `Domain` attribute.
    pub domain: Option<String>,

    /// Emit the `Secure` attribute.
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cookie_name: "SESSID".to_string(),
            expiration_secs: 259_200, // 3 days
            cleanup_interval_secs: 300,
            domain: None,
            secure: false,
        }
    }
}

/// Module selection.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ModulesConfig {
    /// Module names that are never loaded.
    pub disabled: Vec<String>,

    /// Load modules left over by a dependency cycle, after the ordered ones.
    pub load_unresolved: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: FrameworkConfig = toml::from_str("").unwrap();
        assert_eq!(config, FrameworkConfig::default());
        assert_eq!(config.session.cookie_name, "SESSID");
        assert_eq!(config.routing.syntax(), PatternSyntax::default());
    }

    #[test]
    fn test_partial_sections() {
        let config: FrameworkConfig = toml::from_str(
            r#"
            [routing]
            wildcard = "*"
            collision_policy = "reject"

            [modules]
            disabled = ["blog"]
            "#,
        )
        .unwrap();

        assert_eq!(config.routing.separator, "/");
        assert_eq!(config.routing.wildcard, "*");
        assert_eq!(config.routing.collision_policy, CollisionPolicy::Reject);
        assert_eq!(config.modules.disabled, vec!["blog"]);
        assert!(!config.modules.load_unresolved);
    }
}
