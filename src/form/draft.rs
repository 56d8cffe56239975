use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::{FormError, FormResult};
use super::object::{FormId, ObjectAccessor, Record};

/// Persistence for records that were edited but not yet submitted.
pub trait FormDraftStore: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn save(&self, form_id: FormId, record: &Record) -> Result<(), Self::Error>;
    fn load(&self, form_id: FormId) -> Result<Option<Record>, Self::Error>;
    fn clear(&self, form_id: FormId) -> Result<(), Self::Error>;
}

#[derive(Clone, Default)]
pub struct InMemoryDraftStore {
    state: Arc<RwLock<BTreeMap<FormId, Record>>>,
}

impl InMemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().is_empty()
    }
}

impl FormDraftStore for InMemoryDraftStore {
    type Error = Infallible;

    fn save(&self, form_id: FormId, record: &Record) -> Result<(), Self::Error> {
        self.state.write().insert(form_id, record.clone());
        Ok(())
    }

    fn load(&self, form_id: FormId) -> Result<Option<Record>, Self::Error> {
        Ok(self.state.read().get(&form_id).cloned())
    }

    fn clear(&self, form_id: FormId) -> Result<(), Self::Error> {
        self.state.write().remove(&form_id);
        Ok(())
    }
}

impl<T> ObjectAccessor<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Saves the live record as-is, even when it would not decode or validate yet.
    pub fn save_draft<S>(&self, store: &S) -> FormResult<()>
    where
        S: FormDraftStore,
    {
        store
            .save(self.id(), &self.record())
            .map_err(|error| FormError::DraftSaveFailed(error.to_string()))
    }

    /// Applies a saved draft through the field accessors, so change listeners observe it.
    /// Returns `false` when there is nothing saved for this form.
    pub fn load_draft<S>(&self, store: &S) -> FormResult<bool>
    where
        S: FormDraftStore,
    {
        let Some(draft) = store
            .load(self.id())
            .map_err(|error| FormError::DraftLoadFailed(error.to_string()))?
        else {
            return Ok(false);
        };
        tracing::debug!(form_id = self.id().0, fields = draft.len(), "loading draft");
        self.set_record(draft);
        Ok(true)
    }

    pub fn clear_draft<S>(&self, store: &S) -> FormResult<()>
    where
        S: FormDraftStore,
    {
        store
            .clear(self.id())
            .map_err(|error| FormError::DraftClearFailed(error.to_string()))
    }
}
