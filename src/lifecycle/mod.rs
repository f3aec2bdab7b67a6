//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Load plugins (fatal on failure) → Bind → Serve
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C or trigger() → stop accepting → drain in-flight requests → exit
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
