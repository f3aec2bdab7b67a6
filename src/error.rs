//! Error reporting helpers shared across subsystems.

use std::error::Error;
use std::fmt::Write;

/// Render an error together with its full chain of causes, one per line.
///
/// Used wherever an error is handed back to a human (400 bodies, diagnostic
/// log records) so the original cause is never lost behind a wrapper.
pub fn report(err: &(dyn Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(out, "\n  caused by: {}", cause);
        source = cause.source();
    }
    out
}
