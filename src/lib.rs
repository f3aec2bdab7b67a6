//! Interception proxy library.
//!
//! Sits between a test client and a remote XML service, forwards each
//! request, and runs the reply through a hot-swappable chain of response
//! plugins before answering.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod plugin;
pub mod state;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use plugin::PluginRegistry;
