use std::sync::Arc;

use serde::{Deserialize, Serialize};

use carepoint_core::draft_keys;
use carepoint_core::models::form::FormType;
use carepoint_core::models::record::{RecordId, RecordPayload};
use carepoint_core::models::snapshot::FormSnapshot;
use carepoint_forms::forms::{doctor_registration as doc, opd_visit as opd, patient_admission as adm};
use carepoint_session::service::{
    BoxFuture, ExternalError, LookupCandidate, LookupService, RecordService,
};
use carepoint_storage::kv::KeyValueStore;

/// A record as kept on this machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    pub payload: RecordPayload,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
}

/// Record and lookup services backed by local key-value storage, for
/// running without a hospital backend.
#[derive(Clone)]
pub struct LocalRecordService {
    store: Arc<dyn KeyValueStore>,
}

impl LocalRecordService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, id: RecordId) -> Result<Option<StoredRecord>, ExternalError> {
        let key = draft_keys::record(id);
        let Some(body) = self.store.get(&key).map_err(storage_error)? else {
            return Ok(None);
        };
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| ExternalError::new(format!("record {id} is unreadable: {e}")))
    }

    /// Every readable record, oldest first.
    pub fn list(&self) -> Result<Vec<StoredRecord>, ExternalError> {
        let keys = self
            .store
            .keys(draft_keys::RECORD_PREFIX)
            .map_err(storage_error)?;
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(body) = self.store.get(&key).map_err(storage_error)? else {
                continue;
            };
            match serde_json::from_str::<StoredRecord>(&body) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(key = %key, error = %e, "skipping unreadable record"),
            }
        }
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    fn put(&self, record: &StoredRecord) -> Result<(), ExternalError> {
        let body = serde_json::to_string(record)
            .map_err(|e| ExternalError::new(format!("could not encode record: {e}")))?;
        self.store
            .set(&draft_keys::record(record.id), &body)
            .map_err(storage_error)
    }

    fn create_now(&self, payload: RecordPayload) -> Result<RecordId, ExternalError> {
        let now = jiff::Timestamp::now();
        let record = StoredRecord {
            id: RecordId::new(),
            payload,
            created_at: now,
            updated_at: now,
        };
        self.put(&record)?;
        tracing::info!(record_id = %record.id, kind = %record.payload.form_type(), "record created");
        Ok(record.id)
    }

    fn update_now(&self, id: RecordId, payload: RecordPayload) -> Result<(), ExternalError> {
        let mut record = self
            .get(id)?
            .ok_or_else(|| ExternalError::new(format!("record {id} not found")))?;
        if record.payload.form_type() != payload.form_type() {
            return Err(ExternalError::new(format!(
                "record {id} is a {} record",
                record.payload.form_type()
            )));
        }
        record.payload = payload;
        record.updated_at = jiff::Timestamp::now();
        self.put(&record)?;
        tracing::info!(record_id = %id, "record updated");
        Ok(())
    }

    fn search_now(
        &self,
        form_type: FormType,
        query: &str,
    ) -> Result<Vec<LookupCandidate>, ExternalError> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.payload.display_name().to_lowercase().contains(&needle))
            .filter_map(|r| {
                let prefill = prefill_for(form_type, &r.payload)?;
                Some(LookupCandidate {
                    record_id: r.id,
                    source: r.payload.form_type(),
                    label: format!("{} ({})", r.payload.display_name(), r.payload.form_type()),
                    prefill,
                })
            })
            .collect())
    }
}

fn storage_error(e: carepoint_storage::error::StorageError) -> ExternalError {
    ExternalError::new(format!("local record storage failed: {e}"))
}

fn full_name(first: &str, last: &str) -> String {
    if last.is_empty() {
        first.to_string()
    } else {
        format!("{first} {last}")
    }
}

/// Values from an existing record that seed a new `form_type` form.
/// `None` when the record says nothing useful about that form.
pub fn prefill_for(form_type: FormType, payload: &RecordPayload) -> Option<FormSnapshot> {
    let mut s = FormSnapshot::new();
    match (form_type, payload) {
        (FormType::DoctorRegistration, RecordPayload::Doctor(r)) => {
            s.set(doc::FULL_NAME, full_name(&r.first_name, &r.last_name));
            s.set(doc::EMAIL, r.email.as_str());
            s.set(doc::PHONE, r.phone.as_str());
            s.set(doc::GENDER, r.gender.as_str());
            s.set(doc::DATE_OF_BIRTH, r.date_of_birth);
            s.set(doc::DEPARTMENT, r.department.as_str());
            s.set(doc::SPECIALIZATION, r.specialization.as_str());
            s.set(doc::REGISTRATION_NUMBER, r.registration_number.as_str());
            s.set(doc::EXPERIENCE_YEARS, f64::from(r.experience_years));
            s.set(doc::QUALIFICATIONS, r.qualifications.clone());
            s.set(doc::LANGUAGES, r.languages.clone());
            s.set(doc::AVAILABLE_DAYS, r.available_days.clone());
            s.set(doc::CONSULTATION_START, r.consultation_start.as_str());
            s.set(doc::CONSULTATION_END, r.consultation_end.as_str());
            s.set(doc::CONSULTATION_FEE, r.consultation_fee);
        }
        (FormType::PatientAdmission, RecordPayload::Admission(r)) => {
            s.set(adm::FULL_NAME, full_name(&r.first_name, &r.last_name));
            s.set(adm::DATE_OF_BIRTH, r.date_of_birth);
            s.set(adm::GENDER, r.gender.as_str());
            s.set(adm::PHONE, r.phone.as_str());
            if let Some(address) = &r.address {
                s.set(adm::ADDRESS, address.as_str());
            }
            s.set(adm::ALLERGIES, r.allergies.clone());
        }
        (FormType::PatientAdmission, RecordPayload::Visit(r)) => {
            s.set(adm::FULL_NAME, full_name(&r.first_name, &r.last_name));
        }
        (FormType::OpdVisit, RecordPayload::Admission(r)) => {
            s.set(opd::FULL_NAME, full_name(&r.first_name, &r.last_name));
            s.set(opd::DATE_OF_BIRTH, r.date_of_birth);
            s.set(opd::DOCTOR, r.attending_doctor.as_str());
        }
        (FormType::OpdVisit, RecordPayload::Visit(r)) => {
            s.set(opd::FULL_NAME, full_name(&r.first_name, &r.last_name));
            if let Some(patient_id) = &r.patient_id {
                s.set(opd::PATIENT_ID, patient_id.as_str());
            }
            s.set(opd::DOCTOR, r.doctor.as_str());
        }
        _ => return None,
    }
    Some(s)
}

impl RecordService for LocalRecordService {
    fn create(&self, record: RecordPayload) -> BoxFuture<'_, Result<RecordId, ExternalError>> {
        Box::pin(async move { self.create_now(record) })
    }

    fn update(
        &self,
        id: RecordId,
        record: RecordPayload,
    ) -> BoxFuture<'_, Result<(), ExternalError>> {
        Box::pin(async move { self.update_now(id, record) })
    }
}

impl LookupService for LocalRecordService {
    fn search<'a>(
        &'a self,
        form_type: FormType,
        query: &'a str,
    ) -> BoxFuture<'a, Result<Vec<LookupCandidate>, ExternalError>> {
        Box::pin(async move { self.search_now(form_type, query) })
    }
}
