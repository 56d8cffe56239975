use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::controller::{FormAccessor, SubmitOutcome};
use super::error::FormResult;

pub type BoxedSubmitFuture<R, P> =
    Pin<Box<dyn Future<Output = FormResult<SubmitOutcome<R, P>>> + Send + 'static>>;

/// The part of a native form event the adapter needs.
pub trait FormEvent {
    fn prevent_default(&mut self);
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct NativeFormEvent {
    default_prevented: bool,
}

impl NativeFormEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

impl FormEvent for NativeFormEvent {
    fn prevent_default(&mut self) {
        self.default_prevented = true;
    }
}

/// Reset and submit handlers shaped like a native form's `onreset` / `onsubmit`.
pub struct FormEvents<T, R, P = ()> {
    form: FormAccessor<T, R, P>,
}

impl<T, R, P> Clone for FormEvents<T, R, P> {
    fn clone(&self) -> Self {
        Self {
            form: self.form.clone(),
        }
    }
}

impl<T, R, P> FormEvents<T, R, P>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    R: Send + 'static,
    P: Clone + Send + Sync + 'static,
{
    pub(super) fn new(form: FormAccessor<T, R, P>) -> Self {
        Self { form }
    }

    pub fn on_reset(&self, event: &mut dyn FormEvent) {
        event.prevent_default();
        self.form.reset();
    }

    /// Prevents the default action before returning; the returned future runs the submit.
    pub fn on_submit(&self, event: &mut dyn FormEvent) -> BoxedSubmitFuture<R, P> {
        event.prevent_default();
        let form = self.form.clone();
        Box::pin(async move { form.submit().await })
    }
}
