pub mod form;
pub mod prelude;
pub mod reactive;

pub use form::{FieldAccessor, FormAccessor, ObjectAccessor};
pub use reactive::{ReactiveCell, Signal};
