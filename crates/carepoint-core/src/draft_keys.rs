//! Storage key conventions.
//!
//! Pure string functions. These define the canonical layout of entries in
//! the durable key-value store shared by every form session.

use crate::models::form::FormType;
use crate::models::record::RecordId;

pub const DRAFT_PREFIX: &str = "draft:";

pub const RECORD_PREFIX: &str = "record:";

/// One draft per owner per form type.
pub fn draft(owner_id: &str, form_type: FormType) -> String {
    format!("{DRAFT_PREFIX}{owner_id}:{form_type}")
}

pub fn owner_prefix(owner_id: &str) -> String {
    format!("{DRAFT_PREFIX}{owner_id}:")
}

pub fn record(id: RecordId) -> String {
    format!("{RECORD_PREFIX}{id}")
}
