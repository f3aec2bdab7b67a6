//! Plugins shipped with the proxy.
//!
//! - `custom`: reply with a fixed literal instead of the upstream document
//! - `attribute`: overwrite attribute values on matching elements
//! - `trace`: record the document as it passes through

pub mod attribute;
pub mod custom;
pub mod trace;
