mod binding;
mod controller;
mod draft;
mod error;
mod events;
mod field;
mod object;
mod problem;
mod validation;


pub use binding::{coerce_input, display_value};
pub use controller::{
    BoxedHandlerFuture, BoxedRequestFuture, FormAccessor, FormOptions, SubmitOutcome,
    SubmitPolicy, SubmitState,
};
pub use draft::{FormDraftStore, InMemoryDraftStore};
pub use error::{FormError, FormResult};
pub use events::{BoxedSubmitFuture, FormEvent, FormEvents, NativeFormEvent};
pub use field::{Accessor, ChangeListener, FieldAccessor, FieldKey, FieldKind, ListenerId};
pub use formkit_derive::FormModel;
pub use object::{ErrorMap, Field, FormId, ObjectAccessor, Record};
pub use problem::{Problem, ProblemParam, Return};
pub use validation::{FieldErrors, FieldLens, FormModel, Validation, field_errors};
