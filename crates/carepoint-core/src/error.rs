use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown form type: {0}")]
    UnknownFormType(String),

    #[error("unknown section: {0}")]
    UnknownSection(String),

    #[error("invalid record id: {0}")]
    InvalidRecordId(#[from] uuid::Error),
}
