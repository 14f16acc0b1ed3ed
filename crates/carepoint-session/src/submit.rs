use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use carepoint_core::models::record::RecordId;
use carepoint_core::models::snapshot::FormSnapshot;
use carepoint_forms::FormDefinition;
use carepoint_forms::rules::ValidationContext;

use crate::error::SubmitError;
use crate::service::RecordService;

/// Validate, map, and hand a completed form to the record service.
///
/// At most one submission runs at a time per pipeline. The external
/// service is never called unless the whole form validates.
pub struct SubmissionPipeline {
    form: &'static dyn FormDefinition,
    records: Arc<dyn RecordService>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the submission ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SubmissionPipeline {
    pub fn new(form: &'static dyn FormDefinition, records: Arc<dyn RecordService>) -> Self {
        Self {
            form,
            records,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit `snapshot`. With `target` set the existing record is updated,
    /// otherwise a new one is created. Returns the record's id.
    pub async fn submit(
        &self,
        snapshot: &FormSnapshot,
        target: Option<RecordId>,
        ctx: &ValidationContext,
    ) -> Result<RecordId, SubmitError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SubmitError::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let form_type = self.form.form_type();
        if let Err(errors) = self.form.validate_all(snapshot, ctx) {
            info!(%form_type, invalid = errors.len(), "submission blocked by validation");
            return Err(errors.into());
        }
        let record = self.form.to_record(snapshot, ctx)?;

        let result = match target {
            Some(id) => self.records.update(id, record).await.map(|()| id),
            None => self.records.create(record).await,
        };
        match &result {
            Ok(id) => info!(%form_type, record_id = %id, "record submitted"),
            Err(e) => warn!(%form_type, error = %e, "record service rejected submission"),
        }
        Ok(result?)
    }
}
