use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::field::FieldKey;

/// Field name to error message. An empty map means the record is valid.
pub type FieldErrors = BTreeMap<FieldKey, String>;

pub trait Validation<T>: Send + Sync {
    fn validate(&self, record: &T) -> Option<FieldErrors>;
}

impl<T, F> Validation<T> for F
where
    F: Fn(&T) -> Option<FieldErrors> + Send + Sync,
{
    fn validate(&self, record: &T) -> Option<FieldErrors> {
        (self)(record)
    }
}

/// Typed handle naming one field of a [`FormModel`] by its serialized key.
pub trait FieldLens<T>: Copy + Send + Sync + 'static {
    type Value: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static;

    fn key(self) -> FieldKey;
}

pub trait FormModel: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Fields;

    fn fields() -> Self::Fields;
}

/// Collects `(field, message)` pairs into [`FieldErrors`], keeping the first message per field.
pub fn field_errors<K, M>(errors: impl IntoIterator<Item = (K, M)>) -> FieldErrors
where
    K: Into<FieldKey>,
    M: Into<String>,
{
    let mut collected = FieldErrors::new();
    for (key, message) in errors {
        collected.entry(key.into()).or_insert_with(|| message.into());
    }
    collected
}
