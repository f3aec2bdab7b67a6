//! Configuration schema definitions.
//!
//! This module defines the process-level configuration of the proxy.
//! All types derive Serde traits for deserialization from a TOML file.
//! Plugin configuration is separate (see [`crate::config::ini`]) because it
//! is replaced at runtime through `POST /config`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the interception proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The real service requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Plugin directory and initial plugin configuration.
    pub plugins: PluginsConfig,

    /// Diagnostic log category switches.
    pub diagnostics: DiagnosticsConfig,

    /// Size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Upstream service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the upstream service. The proxied request's path and
    /// query are appended to it.
    pub url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9000".to_string(),
        }
    }
}

/// Plugin discovery and initial configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Directory scanned for `<name>_plugin` markers.
    pub directory: PathBuf,

    /// Initial plugin configuration (ini). When absent, every discovered
    /// plugin is loaded with no options.
    pub config_path: Option<PathBuf>,

    /// Reload plugins whenever `config_path` changes on disk.
    pub watch: bool,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("plugins"),
            config_path: None,
            watch: false,
        }
    }
}

/// Diagnostic log category switches, applied on top of the per-category
/// defaults. Names must be known categories.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub enable: Vec<String>,
    pub disable: Vec<String>,
}

/// Size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request and upstream response body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 16 * 1024 * 1024, // 16MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
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
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
