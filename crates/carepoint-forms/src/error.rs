use thiserror::Error;

use carepoint_core::error::CoreError;

use crate::rules::ValidationErrors;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("unknown field '{path}' for form '{form}'")]
    UnknownField { form: String, path: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}
