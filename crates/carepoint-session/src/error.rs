use thiserror::Error;

use carepoint_core::models::form::SectionKey;
use carepoint_forms::error::FormError;
use carepoint_forms::rules::ValidationErrors;
use carepoint_storage::error::StorageError;

use crate::service::ExternalError;

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("section '{section}' has {} invalid field(s)", .errors.len())]
    Blocked {
        section: SectionKey,
        errors: ValidationErrors,
    },

    #[error("section '{0}' is not part of this form")]
    UnknownSection(SectionKey),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("could not build record: {0}")]
    Mapping(#[from] FormError),

    #[error("record service error: {0}")]
    External(#[from] ExternalError),

    #[error("a submission is already in progress")]
    InFlight,

    #[error("session was reset while the submission was in flight")]
    Superseded,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Submit(#[from] SubmitError),
}
