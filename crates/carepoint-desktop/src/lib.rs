//! carepoint-desktop library root.
//!
//! Re-exports internal modules so that integration tests can exercise the
//! config layer, local record service, and commands directly without going
//! through the binary.

pub mod commands;
pub mod config;
pub mod local_records;
