//! carepoint-core
//!
//! Pure domain types for the Carepoint form engine: form and section
//! identifiers, field snapshots, draft envelopes, external record shapes,
//! and the small clinical/billing arithmetic the forms display.
//! No I/O; this is the shared vocabulary of the Carepoint system.

pub mod age;
pub mod billing;
pub mod draft_keys;
pub mod error;
pub mod models;
pub mod vitals;
