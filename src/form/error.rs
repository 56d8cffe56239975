use thiserror::Error;

use super::field::{FieldKey, FieldKind};

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FormError {
    #[error("form model must serialize to a JSON object: {0}")]
    NotARecord(String),
    #[error("failed to encode value for field '{field}': {message}")]
    Encode { field: FieldKey, message: String },
    #[error("failed to decode form record: {message}")]
    Decode { message: String },
    #[error("form submit is already in progress")]
    AlreadySubmitting,
    #[error("invalid {kind} input for field '{field}': {message}")]
    InvalidInput {
        field: FieldKey,
        kind: FieldKind,
        message: String,
    },
    #[error("failed to load draft: {0}")]
    DraftLoadFailed(String),
    #[error("failed to save draft: {0}")]
    DraftSaveFailed(String),
    #[error("failed to clear draft: {0}")]
    DraftClearFailed(String),
}

pub type FormResult<T> = Result<T, FormError>;
