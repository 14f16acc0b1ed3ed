//! carepoint-storage
//!
//! Durable key-value storage and the draft store built on it. The store is
//! an injected capability so hosts and tests can swap the backend.

pub mod drafts;
pub mod error;
pub mod file;
pub mod kv;
