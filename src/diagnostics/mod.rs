//! Diagnostic log subsystem.
//!
//! A test-facing record store, separate from `tracing` output. Test
//! harnesses poll `GET /num_entries` and read the rendered page; plugins
//! write into it through a [`DiagnosticSink`].
//!
//! # Data Flow
//! ```text
//! startup flags → CategoryRegistry (fixed)
//! handler / plugin → DiagnosticLog::log(client, category, ...)
//!     → dropped if category disabled
//!     → appended to ClientLog for that address
//! GET /num_entries → count_all()
//! GET <other>      → render.rs
//! ```

pub mod category;
pub mod log;
pub mod render;

pub use category::{Category, CategoryRegistry, LogCategory, UnknownCategory};
pub use log::{ClientLog, DiagnosticLog, DiagnosticSink, LogRecord};
pub use render::render_page;
