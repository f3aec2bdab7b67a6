//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (one task per connection)
//!     → server.rs (Axum setup, layers, request ID)
//!     → handlers.rs
//!         GET  /num_entries   → diagnostic record count
//!         GET  /config        → current plugin config text
//!         GET  /wait_request  → block until a proxied request completes
//!         GET  <other>        → diagnostic log page
//!         POST /config        → reload plugins, swap snapshot
//!         POST <other>        → upstream → pipeline → client
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer, StartupError};
