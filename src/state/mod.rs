//! Shared mutable proxy state.
//!
//! - [`SnapshotStore`]: the current (plugin config, plugin chain) pair,
//!   swapped atomically as one value.
//! - [`RequestProcessedSignal`]: wakes `GET /wait_request` callers when a
//!   proxied request finishes.

pub mod signal;
pub mod snapshot;

pub use signal::{RequestProcessedSignal, Waiter};
pub use snapshot::{Snapshot, SnapshotStore};
