//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! proxy.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (immutable for the process lifetime)
//!
//! plugin configuration (ini text)
//!     → ini.rs (parse into PluginConfig)
//!     → plugin loader builds a new chain
//!     → atomic swap of the (config, chain) snapshot
//!
//! Plugin config arrives from:
//!     startup (plugins.config_path)
//!     POST /config
//!     watcher.rs when plugins.watch is set
//! ```

pub mod ini;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use ini::{IniError, PluginConfig};
pub use loader::{load_config, load_plugin_config, ConfigError};
pub use schema::{
    DiagnosticsConfig, LimitsConfig, ListenerConfig, ObservabilityConfig, PluginsConfig,
    ProxyConfig, UpstreamConfig,
};
