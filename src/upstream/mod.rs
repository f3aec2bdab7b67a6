//! Forwarding to the real upstream service.
//!
//! One plain HTTP request per proxied call: no pooling guarantees, no
//! retries, no timeout beyond the OS socket defaults.

pub mod client;

pub use client::{UpstreamClient, UpstreamError, UpstreamResponse};
