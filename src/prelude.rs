pub use crate::form::{
    Accessor, FieldAccessor, FieldErrors, FieldKey, FieldKind, FieldLens, FormAccessor,
    FormError, FormEvent, FormModel, FormOptions, FormResult, ObjectAccessor, Problem, Return,
    SubmitOutcome, SubmitPolicy, Validation, field_errors,
};
pub use crate::reactive::{ReactiveCell, Signal};
