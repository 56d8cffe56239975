use std::borrow::Borrow;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::reactive::{ReactiveCell, Signal};

/// Stable field identifier, also used as the `name` attribute of native controls.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(Arc<str>);

impl FieldKey {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&*self.0, f)
    }
}

impl Borrow<str> for FieldKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FieldKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldKey {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<String> for FieldKey {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl From<&String> for FieldKey {
    fn from(value: &String) -> Self {
        Self(value.as_str().into())
    }
}

impl From<&FieldKey> for FieldKey {
    fn from(value: &FieldKey) -> Self {
        value.clone()
    }
}

impl PartialEq<str> for FieldKey {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for FieldKey {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl Serialize for FieldKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FieldKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// Runtime shape of a field's value, for values whose Rust type does not pin it down
/// (a JSON string may hold free text or a date).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FieldKind {
    Text,
    Number,
    Decimal,
    Bool,
    Date,
    DateTime,
    List,
    Json,
}

impl FieldKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Decimal => "decimal",
            FieldKind::Bool => "bool",
            FieldKind::Date => "date",
            FieldKind::DateTime => "datetime",
            FieldKind::List => "list",
            FieldKind::Json => "json",
        }
    }
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ListenerId(pub u64);

/// Called with `(new, old)` before the new value is committed.
pub type ChangeListener<V> = Arc<dyn Fn(&V, &V) + Send + Sync>;

/// Capability handed to a view for reading and writing one logical field.
pub trait Accessor<V>: Send + Sync {
    fn name(&self) -> &FieldKey;
    fn kind(&self) -> Option<FieldKind>;
    fn value(&self) -> V;
    fn set_value(&self, value: V);
    fn on_change(&self, listener: ChangeListener<V>) -> ListenerId;
    fn remove_listener(&self, id: ListenerId) -> bool;
    fn error(&self) -> Option<String>;
    fn set_error(&self, error: Option<String>);
    fn reset(&self);
    fn has_help(&self) -> bool;
}

/// Where a field's value, baseline and error actually live.
pub(super) trait FieldSource<V>: Send + Sync {
    fn read(&self) -> V;
    fn write(&self, value: V);
    fn preset(&self) -> V;
    fn set_preset(&self, value: V);
    fn error(&self) -> Option<String>;
    fn set_error(&self, error: Option<String>);
}

struct CellSource<V> {
    value: Arc<dyn ReactiveCell<V>>,
    preset: RwLock<V>,
    error: Signal<Option<String>>,
}

impl<V> FieldSource<V> for CellSource<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn read(&self) -> V {
        self.value.get()
    }

    fn write(&self, value: V) {
        self.value.set(value);
    }

    fn preset(&self) -> V {
        self.preset.read().clone()
    }

    fn set_preset(&self, value: V) {
        *self.preset.write() = value;
    }

    fn error(&self) -> Option<String> {
        self.error.get()
    }

    fn set_error(&self, error: Option<String>) {
        self.error.set(error);
    }
}

pub struct FieldAccessor<V> {
    name: FieldKey,
    kind: RwLock<Option<FieldKind>>,
    has_help: AtomicBool,
    source: Box<dyn FieldSource<V>>,
    listeners: RwLock<Vec<(ListenerId, ChangeListener<V>)>>,
    next_listener: AtomicU64,
}

impl<V> FieldAccessor<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    /// Standalone field owning its value; the initial value is the preset.
    pub fn new(name: impl Into<FieldKey>, initial: V) -> Self {
        Self::with_cell(name, Arc::new(Signal::new(initial)))
    }

    /// Field driven by a cell that already exists outside the accessor. The cell's current
    /// value becomes the preset.
    pub fn with_cell(name: impl Into<FieldKey>, cell: Arc<dyn ReactiveCell<V>>) -> Self {
        let preset = cell.get();
        Self::from_source(
            name.into(),
            Box::new(CellSource {
                value: cell,
                preset: RwLock::new(preset),
                error: Signal::new(None),
            }),
        )
    }

    pub(super) fn from_source(name: FieldKey, source: Box<dyn FieldSource<V>>) -> Self {
        Self {
            name,
            kind: RwLock::new(None),
            has_help: AtomicBool::new(false),
            source,
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        *self.kind.get_mut() = Some(kind);
        self
    }

    pub fn with_help(self, has_help: bool) -> Self {
        self.has_help.store(has_help, Ordering::Relaxed);
        self
    }

    pub fn name(&self) -> &FieldKey {
        &self.name
    }

    pub fn kind(&self) -> Option<FieldKind> {
        *self.kind.read()
    }

    pub(super) fn assign_kind(&self, kind: FieldKind) {
        *self.kind.write() = Some(kind);
    }

    pub fn has_help(&self) -> bool {
        self.has_help.load(Ordering::Relaxed)
    }

    pub(super) fn request_help(&self) {
        self.has_help.store(true, Ordering::Relaxed);
    }

    pub fn value(&self) -> V {
        self.source.read()
    }

    /// Writes `value` unless it equals the current one. Listeners observe `(new, old)` while
    /// `value()` still returns the old value.
    pub fn set_value(&self, value: V) {
        let old = self.source.read();
        if old == value {
            return;
        }
        let listeners = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect::<Vec<_>>();
        for listener in &listeners {
            listener(&value, &old);
        }
        self.source.write(value);
        tracing::trace!(field = %self.name, listeners = listeners.len(), "field value changed");
    }

    pub fn on_change(&self, listener: impl Fn(&V, &V) + Send + Sync + 'static) -> ListenerId {
        self.push_listener(Arc::new(listener))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn error(&self) -> Option<String> {
        self.source.error()
    }

    pub fn set_error(&self, error: Option<String>) {
        self.source.set_error(error);
    }

    pub fn preset(&self) -> V {
        self.source.preset()
    }

    pub fn set_preset(&self, value: V) {
        self.source.set_preset(value);
    }

    pub fn is_at_preset(&self) -> bool {
        self.source.read() == self.source.preset()
    }

    pub fn reset(&self) {
        self.set_value(self.source.preset());
        self.set_error(None);
    }

    fn push_listener(&self, listener: ChangeListener<V>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }
}

impl<V> Accessor<V> for FieldAccessor<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    fn name(&self) -> &FieldKey {
        FieldAccessor::name(self)
    }

    fn kind(&self) -> Option<FieldKind> {
        FieldAccessor::kind(self)
    }

    fn value(&self) -> V {
        FieldAccessor::value(self)
    }

    fn set_value(&self, value: V) {
        FieldAccessor::set_value(self, value);
    }

    fn on_change(&self, listener: ChangeListener<V>) -> ListenerId {
        self.push_listener(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        FieldAccessor::remove_listener(self, id)
    }

    fn error(&self) -> Option<String> {
        FieldAccessor::error(self)
    }

    fn set_error(&self, error: Option<String>) {
        FieldAccessor::set_error(self, error);
    }

    fn reset(&self) {
        FieldAccessor::reset(self);
    }

    fn has_help(&self) -> bool {
        FieldAccessor::has_help(self)
    }
}

impl<V> Debug for FieldAccessor<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("name", &self.name)
            .field("kind", &*self.kind.read())
            .field("has_help", &self.has_help.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
