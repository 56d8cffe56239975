use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{FormError, FormResult};
use super::field::{FieldAccessor, FieldKey, FieldKind, FieldSource, ListenerId};
use super::problem::Problem;
use super::validation::{FieldLens, Validation};
use crate::reactive::{ReactiveCell, Signal, SubscriptionId};

/// Live or baseline values of one record, keyed by serialized field name.
pub type Record = serde_json::Map<String, Value>;

/// Sparse field error map; a missing key means the field has no error.
pub type ErrorMap = BTreeMap<FieldKey, String>;

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

struct RecordStore {
    id: AtomicU64,
    preset: RwLock<Record>,
    values: Arc<dyn ReactiveCell<Record>>,
    errors: Arc<dyn ReactiveCell<ErrorMap>>,
    at_preset: Signal<bool>,
    values_subscription: SubscriptionId,
}

impl RecordStore {
    fn new(
        preset: Record,
        values: Arc<dyn ReactiveCell<Record>>,
        errors: Arc<dyn ReactiveCell<ErrorMap>>,
    ) -> Arc<Self> {
        let at_preset = record_matches_preset(&preset, &values.get());
        Arc::new_cyclic(|store: &Weak<RecordStore>| {
            let store = store.clone();
            // Writes made directly on a host-owned cell still keep the flag current.
            let values_subscription = values.subscribe(Arc::new(move |_: &Record| {
                if let Some(store) = store.upgrade() {
                    store.refresh_at_preset();
                }
            }));
            RecordStore {
                id: AtomicU64::new(FormId::next().0),
                preset: RwLock::new(preset),
                values,
                errors,
                at_preset: Signal::new(at_preset),
                values_subscription,
            }
        })
    }

    fn form_id(&self) -> u64 {
        self.id.load(Ordering::Relaxed)
    }

    fn refresh_at_preset(&self) {
        let values = self.values.get();
        let at_preset = record_matches_preset(&self.preset.read(), &values);
        if self.at_preset.get() != at_preset {
            tracing::trace!(form_id = self.form_id(), at_preset, "record preset state changed");
            self.at_preset.set(at_preset);
        }
    }

    fn update_errors(&self, update: impl FnOnce(&mut ErrorMap) -> bool) {
        let mut errors = self.errors.get();
        if update(&mut errors) {
            self.errors.set(errors);
        }
    }
}

impl Drop for RecordStore {
    fn drop(&mut self) {
        self.values.unsubscribe(self.values_subscription);
    }
}

/// Keys absent from the preset never make a record diverge.
fn record_matches_preset(preset: &Record, values: &Record) -> bool {
    preset
        .iter()
        .all(|(key, expected)| values.get(key) == Some(expected))
}

struct RecordSource {
    store: Arc<RecordStore>,
    key: FieldKey,
}

impl FieldSource<Value> for RecordSource {
    fn read(&self) -> Value {
        self.store
            .values
            .get()
            .get(self.key.as_str())
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn write(&self, value: Value) {
        let mut record = self.store.values.get();
        record.insert(self.key.to_string(), value);
        self.store.values.set(record);
        self.store.refresh_at_preset();
    }

    fn preset(&self) -> Value {
        self.store
            .preset
            .read()
            .get(self.key.as_str())
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn set_preset(&self, value: Value) {
        {
            self.store
                .preset
                .write()
                .insert(self.key.to_string(), value);
        }
        self.store.refresh_at_preset();
    }

    fn error(&self) -> Option<String> {
        self.store.errors.get().get(&self.key).cloned()
    }

    fn set_error(&self, error: Option<String>) {
        let key = self.key.clone();
        self.store.update_errors(move |errors| match error {
            Some(message) => errors.insert(key, message.clone()).as_ref() != Some(&message),
            None => errors.remove(&key).is_some(),
        });
    }
}

/// Aggregate accessor over one record. Hands out one cached [`FieldAccessor`] per field name,
/// all aliasing the same value and error stores.
pub struct ObjectAccessor<T> {
    store: Arc<RecordStore>,
    fields: Arc<RwLock<BTreeMap<FieldKey, Arc<FieldAccessor<Value>>>>>,
    _model: PhantomData<fn() -> T>,
}

impl<T> Clone for ObjectAccessor<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            fields: self.fields.clone(),
            _model: PhantomData,
        }
    }
}

impl<T> ObjectAccessor<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(preset: T) -> FormResult<Self> {
        Ok(Self::from_record(to_record(&preset)?))
    }

    pub fn from_record(preset: Record) -> Self {
        let values = Arc::new(Signal::new(preset.clone()));
        Self::from_store(RecordStore::new(
            preset,
            values,
            Arc::new(Signal::new(ErrorMap::new())),
        ))
    }

    /// Binds the accessor to cells owned by the host runtime. The values cell is used as-is;
    /// it is not overwritten with `preset`.
    pub fn with_cells(
        preset: T,
        values: Arc<dyn ReactiveCell<Record>>,
        errors: Arc<dyn ReactiveCell<ErrorMap>>,
    ) -> FormResult<Self> {
        Ok(Self::from_store(RecordStore::new(
            to_record(&preset)?,
            values,
            errors,
        )))
    }

    fn from_store(store: Arc<RecordStore>) -> Self {
        Self {
            store,
            fields: Arc::new(RwLock::new(BTreeMap::new())),
            _model: PhantomData,
        }
    }

    pub fn id(&self) -> FormId {
        FormId(self.store.form_id())
    }

    /// Replaces the allocated id, e.g. with one derived from the edited entity so a draft saved
    /// by a previous view can be found again.
    pub fn with_form_id(self, id: FormId) -> Self {
        self.store.id.store(id.0, Ordering::Relaxed);
        self
    }

    pub fn preset(&self) -> Record {
        self.store.preset.read().clone()
    }

    pub fn set_preset(&self, preset: T) -> FormResult<()> {
        self.set_preset_record(to_record(&preset)?);
        Ok(())
    }

    pub fn set_preset_record(&self, preset: Record) {
        {
            *self.store.preset.write() = preset;
        }
        self.store.refresh_at_preset();
    }

    pub fn accessor(&self, name: impl Into<FieldKey>) -> Arc<FieldAccessor<Value>> {
        self.accessor_with_help(name, false)
    }

    /// Like [`accessor`](Self::accessor); `has_help = true` marks the field as needing
    /// error-display space and stays set for the lifetime of the accessor.
    pub fn accessor_with_help(
        &self,
        name: impl Into<FieldKey>,
        has_help: bool,
    ) -> Arc<FieldAccessor<Value>> {
        let key = name.into();
        let cached = self.fields.read().get(&key).cloned();
        let field = match cached {
            Some(field) => field,
            None => self
                .fields
                .write()
                .entry(key.clone())
                .or_insert_with(|| {
                    Arc::new(FieldAccessor::from_source(
                        key.clone(),
                        Box::new(RecordSource {
                            store: self.store.clone(),
                            key: key.clone(),
                        }),
                    ))
                })
                .clone(),
        };
        if has_help {
            field.request_help();
        }
        field
    }

    pub fn accessor_of_kind(
        &self,
        name: impl Into<FieldKey>,
        kind: FieldKind,
    ) -> Arc<FieldAccessor<Value>> {
        let field = self.accessor(name);
        field.assign_kind(kind);
        field
    }

    pub fn field<L>(&self, lens: L) -> Field<L::Value>
    where
        L: FieldLens<T>,
    {
        self.typed(lens.key())
    }

    pub fn typed<FT>(&self, name: impl Into<FieldKey>) -> Field<FT>
    where
        FT: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        Field {
            accessor: self.accessor(name),
            _value: PhantomData,
        }
    }

    pub fn field_names(&self) -> Vec<FieldKey> {
        self.fields.read().keys().cloned().collect()
    }

    pub fn record(&self) -> Record {
        self.store.values.get()
    }

    /// Current record, or `None` after writing the errors reported by `validation` onto their
    /// fields.
    pub fn object(&self, validation: Option<&dyn Validation<T>>) -> FormResult<Option<T>> {
        let record = self.decode()?;
        let Some(validation) = validation else {
            return Ok(Some(record));
        };
        let errors = validation.validate(&record).unwrap_or_default();
        if errors.is_empty() {
            return Ok(Some(record));
        }
        tracing::debug!(
            form_id = self.store.form_id(),
            fields = errors.len(),
            "validation rejected record"
        );
        for (name, message) in errors {
            self.accessor_with_help(name, true).set_error(Some(message));
        }
        Ok(None)
    }

    pub fn set_object(&self, object: T) -> FormResult<()> {
        self.set_record(to_record(&object)?);
        Ok(())
    }

    /// Writes every key through its field accessor, so change listeners fire for the keys
    /// that actually change.
    pub fn set_record(&self, record: Record) {
        for (name, value) in record {
            self.accessor(name).set_value(value);
        }
    }

    pub fn errors_from_problem<P>(&self, problem: &Problem<P>) {
        for param in &problem.params {
            self.accessor(param.name.as_str())
                .set_error(Some(param.reason.clone()));
        }
        if !problem.params.is_empty() {
            tracing::debug!(
                form_id = self.store.form_id(),
                status = problem.status,
                fields = problem.params.len(),
                "applied problem params to fields"
            );
        }
    }

    pub fn errors(&self) -> ErrorMap {
        self.store.errors.get()
    }

    pub fn has_errors(&self) -> bool {
        !self.store.errors.get().is_empty()
    }

    pub fn clear_errors(&self) {
        self.store.update_errors(|errors| {
            let had_errors = !errors.is_empty();
            errors.clear();
            had_errors
        });
    }

    pub fn is_at_preset(&self) -> bool {
        self.store.at_preset.get()
    }

    pub fn at_preset_signal(&self) -> Signal<bool> {
        self.store.at_preset.clone()
    }

    /// Preset keys whose live value differs from the baseline.
    pub fn dirty_fields(&self) -> Vec<FieldKey> {
        let values = self.store.values.get();
        self.store
            .preset
            .read()
            .iter()
            .filter(|(key, expected)| values.get(key.as_str()) != Some(*expected))
            .map(|(key, _)| FieldKey::from(key))
            .collect()
    }

    pub fn on_values(
        &self,
        subscriber: impl Fn(&Record) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.store.values.subscribe(Arc::new(subscriber))
    }

    pub fn on_errors(
        &self,
        subscriber: impl Fn(&ErrorMap) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.store.errors.subscribe(Arc::new(subscriber))
    }

    /// Clears every error and restores the preset in a single write. Field change listeners do
    /// not run.
    pub fn reset(&self) {
        self.clear_errors();
        let preset = self.preset();
        self.store.values.set(preset);
        self.store.refresh_at_preset();
        tracing::debug!(form_id = self.store.form_id(), "record reset to preset");
    }

    fn decode(&self) -> FormResult<T> {
        serde_json::from_value(Value::Object(self.store.values.get())).map_err(|error| {
            FormError::Decode {
                message: error.to_string(),
            }
        })
    }
}

impl<T> Debug for ObjectAccessor<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectAccessor")
            .field("id", &FormId(self.store.form_id()))
            .field("fields", &self.fields.read().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

pub(super) fn to_record<T: Serialize>(value: &T) -> FormResult<Record> {
    match serde_json::to_value(value) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(other) => Err(FormError::NotARecord(format!(
            "serialized to {}",
            value_kind(&other)
        ))),
        Err(error) => Err(FormError::NotARecord(error.to_string())),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Typed view over one record field; values cross the store through serde.
pub struct Field<FT> {
    accessor: Arc<FieldAccessor<Value>>,
    _value: PhantomData<fn() -> FT>,
}

impl<FT> Clone for Field<FT> {
    fn clone(&self) -> Self {
        Self {
            accessor: self.accessor.clone(),
            _value: PhantomData,
        }
    }
}

impl<FT> Field<FT>
where
    FT: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn name(&self) -> &FieldKey {
        self.accessor.name()
    }

    pub fn accessor(&self) -> &Arc<FieldAccessor<Value>> {
        &self.accessor
    }

    /// `None` when the field is missing or holds a value of another shape.
    pub fn value(&self) -> Option<FT> {
        decode_field(&self.accessor.value())
    }

    pub fn set_value(&self, value: FT) -> FormResult<()> {
        let encoded = serde_json::to_value(&value).map_err(|error| FormError::Encode {
            field: self.accessor.name().clone(),
            message: error.to_string(),
        })?;
        self.accessor.set_value(encoded);
        Ok(())
    }

    pub fn on_change(
        &self,
        listener: impl Fn(Option<FT>, Option<FT>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.accessor
            .on_change(move |new, old| listener(decode_field(new), decode_field(old)))
    }

    pub fn error(&self) -> Option<String> {
        self.accessor.error()
    }

    pub fn set_error(&self, error: Option<String>) {
        self.accessor.set_error(error);
    }

    pub fn reset(&self) {
        self.accessor.reset();
    }
}

fn decode_field<FT: DeserializeOwned>(value: &Value) -> Option<FT> {
    FT::deserialize(value).ok()
}
