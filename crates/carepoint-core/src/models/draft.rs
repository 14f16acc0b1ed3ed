use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::form::{FormType, SectionKey};
use crate::models::snapshot::FormSnapshot;

/// Current draft envelope version. Bump this when the envelope shape changes.
pub const DRAFT_VERSION: u32 = 1;

/// Navigation state persisted alongside the form values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UiState {
    pub current_section: SectionKey,
    pub completed_sections: BTreeSet<SectionKey>,
}

/// A persisted in-progress form. One per owner per form type; a new save
/// overwrites the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DraftRecord {
    /// Envelope version. Missing = pre-versioned draft.
    #[serde(default)]
    pub version: u32,
    pub owner_id: String,
    pub form_type: FormType,
    pub form_data: FormSnapshot,
    pub ui_state: UiState,
    pub saved_at: jiff::Timestamp,
}
