use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use carepoint_core::models::form::FormType;
use carepoint_core::models::record::{RecordId, RecordPayload};
use carepoint_core::models::snapshot::FormSnapshot;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Failure reported by an external service, with a message fit for the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExternalError {
    pub message: String,
}

impl ExternalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Creates and updates records. Only the submission pipeline calls this.
pub trait RecordService: Send + Sync {
    fn create(&self, record: RecordPayload) -> BoxFuture<'_, Result<RecordId, ExternalError>>;

    fn update(
        &self,
        id: RecordId,
        record: RecordPayload,
    ) -> BoxFuture<'_, Result<(), ExternalError>>;
}

/// An existing record offered as a starting point for a form.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupCandidate {
    pub record_id: RecordId,
    /// The form that produced the record.
    pub source: FormType,
    pub label: String,
    /// Field values to copy into the form.
    pub prefill: FormSnapshot,
}

/// Finds existing patient, doctor, or visit records.
pub trait LookupService: Send + Sync {
    fn search<'a>(
        &'a self,
        form_type: FormType,
        query: &'a str,
    ) -> BoxFuture<'a, Result<Vec<LookupCandidate>, ExternalError>>;
}
