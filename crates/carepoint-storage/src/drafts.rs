use std::sync::Arc;

use tracing::{debug, info, warn};

use carepoint_core::draft_keys;
use carepoint_core::models::draft::{DRAFT_VERSION, DraftRecord, UiState};
use carepoint_core::models::form::FormType;
use carepoint_core::models::snapshot::FormSnapshot;

use crate::error::StorageError;
use crate::kv::KeyValueStore;

/// Saves and restores in-progress forms, one draft per owner per form type.
#[derive(Clone)]
pub struct DraftStore {
    store: Arc<dyn KeyValueStore>,
}

impl DraftStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Serialize the snapshot and UI state under `draft:{owner}:{form}`,
    /// overwriting any previous draft.
    pub fn save(
        &self,
        owner_id: &str,
        form_type: FormType,
        snapshot: &FormSnapshot,
        ui_state: &UiState,
    ) -> Result<DraftRecord, StorageError> {
        self.save_at(owner_id, form_type, snapshot, ui_state, jiff::Timestamp::now())
    }

    /// [`save`](Self::save) with an explicit `saved_at`.
    pub fn save_at(
        &self,
        owner_id: &str,
        form_type: FormType,
        snapshot: &FormSnapshot,
        ui_state: &UiState,
        saved_at: jiff::Timestamp,
    ) -> Result<DraftRecord, StorageError> {
        let record = DraftRecord {
            version: DRAFT_VERSION,
            owner_id: owner_id.to_string(),
            form_type,
            form_data: snapshot.clone(),
            ui_state: ui_state.clone(),
            saved_at,
        };
        let key = draft_keys::draft(owner_id, form_type);
        let body = serde_json::to_string(&record)?;
        self.store.set(&key, &body)?;

        debug!(key = %key, fields = snapshot.len(), "draft saved");
        Ok(record)
    }

    /// Load a draft. Missing, unreadable, corrupt, or too-new drafts all
    /// come back as `None`.
    pub fn load(&self, owner_id: &str, form_type: FormType) -> Option<DraftRecord> {
        let key = draft_keys::draft(owner_id, form_type);
        let body = match self.store.get(&key) {
            Ok(Some(body)) => body,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to read draft");
                return None;
            }
        };
        let record = parse_draft(&key, &body)?;
        if record.owner_id != owner_id || record.form_type != form_type {
            warn!(key = %key, "draft envelope does not match its key, ignoring");
            return None;
        }
        Some(record)
    }

    /// Delete a draft. Safe to call when none exists.
    pub fn clear(&self, owner_id: &str, form_type: FormType) -> Result<(), StorageError> {
        let key = draft_keys::draft(owner_id, form_type);
        self.store.remove(&key)?;
        info!(key = %key, "draft cleared");
        Ok(())
    }

    /// Whether a restorable draft exists.
    pub fn exists(&self, owner_id: &str, form_type: FormType) -> bool {
        self.load(owner_id, form_type).is_some()
    }

    /// Every restorable draft belonging to `owner_id`.
    pub fn list(&self, owner_id: &str) -> Vec<DraftRecord> {
        let keys = match self.store.keys(&draft_keys::owner_prefix(owner_id)) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(owner_id, error = %e, "failed to list drafts");
                return Vec::new();
            }
        };
        keys.iter()
            .filter_map(|key| {
                let body = match self.store.get(key) {
                    Ok(body) => body?,
                    Err(e) => {
                        warn!(key = %key, error = %e, "failed to read draft");
                        return None;
                    }
                };
                parse_draft(key, &body)
            })
            .filter(|record| record.owner_id == owner_id)
            .collect()
    }
}

fn parse_draft(key: &str, body: &str) -> Option<DraftRecord> {
    // Check the envelope version on the raw JSON before committing to a shape.
    let json: serde_json::Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(e) => {
            warn!(key, error = %e, "corrupt draft, treating as absent");
            return None;
        }
    };
    let version = json.get("version").and_then(|v| v.as_u64()).unwrap_or(0);
    if version > u64::from(DRAFT_VERSION) {
        warn!(
            key,
            version,
            supported = DRAFT_VERSION,
            "draft written by a newer build, treating as absent"
        );
        return None;
    }

    let mut record: DraftRecord = match serde_json::from_value(json) {
        Ok(record) => record,
        Err(e) => {
            warn!(key, error = %e, "draft has unexpected shape, treating as absent");
            return None;
        }
    };

    // Dates travel as ISO-8601 text; turn them back into dates.
    let date_paths = carepoint_forms::definition(record.form_type).date_paths();
    record.form_data.revive_dates(date_paths);
    Some(record)
}
