use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::{FormError, FormResult};
use super::events::FormEvents;
use super::object::ObjectAccessor;
use super::problem::{Problem, Return};
use super::validation::Validation;
use crate::reactive::Signal;

pub type BoxedRequestFuture<R, P> = Pin<Box<dyn Future<Output = Return<R, P>> + Send + 'static>>;
pub type BoxedHandlerFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub(super) type RequestFn<T, R, P> = Arc<dyn Fn(T) -> BoxedRequestFuture<R, P> + Send + Sync>;
pub(super) type SuccessFn<R> = Arc<dyn Fn(Option<&R>) + Send + Sync>;
pub(super) type ProblemHandlerFn<P> =
    Arc<dyn Fn(Option<Problem<P>>) -> BoxedHandlerFuture + Send + Sync>;

/// What `submit` does while another submit of the same form is still in flight.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SubmitPolicy {
    #[default]
    Reject,
    Allow,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FormOptions {
    pub submit_policy: SubmitPolicy,
    pub clear_errors_on_submit: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            submit_policy: SubmitPolicy::Reject,
            clear_errors_on_submit: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitState {
    Idle,
    Submitting,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome<R, P = ()> {
    /// Validation rejected the record; no request was made.
    Invalid,
    Succeeded {
        status: u16,
        body: Option<R>,
    },
    Failed {
        status: u16,
        problem: Option<Problem<P>>,
    },
}

impl<R, P> SubmitOutcome<R, P> {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Succeeded { .. })
    }
}

/// Object accessor plus the validate → request → report cycle of one submittable form.
pub struct FormAccessor<T, R, P = ()> {
    pub(super) options: FormOptions,
    pub(super) object: ObjectAccessor<T>,
    pub(super) submitting: Signal<bool>,
    pub(super) in_flight: Arc<AtomicUsize>,
    pub(super) validation: Option<Arc<dyn Validation<T>>>,
    pub(super) request: RequestFn<T, R, P>,
    pub(super) on_success: Option<SuccessFn<R>>,
    pub(super) problem_handler: Option<ProblemHandlerFn<P>>,
}

impl<T, R, P> Clone for FormAccessor<T, R, P> {
    fn clone(&self) -> Self {
        Self {
            options: self.options,
            object: self.object.clone(),
            submitting: self.submitting.clone(),
            in_flight: self.in_flight.clone(),
            validation: self.validation.clone(),
            request: self.request.clone(),
            on_success: self.on_success.clone(),
            problem_handler: self.problem_handler.clone(),
        }
    }
}

impl<T, R, P> FormAccessor<T, R, P>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    R: Send + 'static,
    P: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(object: ObjectAccessor<T>, request: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Return<R, P>> + Send + 'static,
    {
        let request: RequestFn<T, R, P> =
            Arc::new(move |record: T| -> BoxedRequestFuture<R, P> { Box::pin(request(record)) });
        Self {
            options: FormOptions::default(),
            object,
            submitting: Signal::new(false),
            in_flight: Arc::new(AtomicUsize::new(0)),
            validation: None,
            request,
            on_success: None,
            problem_handler: None,
        }
    }

    pub fn with_options(mut self, options: FormOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_validation(mut self, validation: impl Validation<T> + 'static) -> Self {
        self.validation = Some(Arc::new(validation));
        self
    }

    pub fn on_success(mut self, callback: impl Fn(Option<&R>) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    /// Receives every server-reported failure, once per failed submit, after its params have
    /// been written onto the fields.
    pub fn with_problem_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Option<Problem<P>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.problem_handler = Some(Arc::new(
            move |problem: Option<Problem<P>>| -> BoxedHandlerFuture { Box::pin(handler(problem)) },
        ));
        self
    }

    pub fn options(&self) -> FormOptions {
        self.options
    }

    pub fn object(&self) -> &ObjectAccessor<T> {
        &self.object
    }

    pub fn submitting(&self) -> bool {
        self.submitting.get()
    }

    pub fn submitting_signal(&self) -> Signal<bool> {
        self.submitting.clone()
    }

    pub fn state(&self) -> SubmitState {
        if self.submitting() {
            SubmitState::Submitting
        } else {
            SubmitState::Idle
        }
    }

    pub fn reset(&self) {
        self.object.reset();
    }

    pub fn events(&self) -> FormEvents<T, R, P> {
        FormEvents::new(self.clone())
    }

    pub async fn submit(&self) -> FormResult<SubmitOutcome<R, P>> {
        self.enter_submit()?;
        let _release = scopeguard::guard(
            (self.in_flight.clone(), self.submitting.clone()),
            |(in_flight, submitting)| {
                if in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
                    submitting.set(false);
                }
            },
        );
        let form_id = self.object.id().0;

        if self.options.clear_errors_on_submit {
            self.object.clear_errors();
        }
        let Some(record) = self.object.object(self.validation.as_deref())? else {
            tracing::debug!(form_id, "submit stopped by validation");
            return Ok(SubmitOutcome::Invalid);
        };

        tracing::debug!(form_id, "submit request started");
        match (self.request)(record).await {
            Return::Success { status, body } => {
                tracing::debug!(form_id, status, "submit succeeded");
                if let Some(callback) = &self.on_success {
                    callback(body.as_ref());
                }
                Ok(SubmitOutcome::Succeeded { status, body })
            }
            Return::Failure { status, problem } => {
                tracing::warn!(
                    form_id,
                    status,
                    title = ?problem.as_ref().map(|problem| problem.title.as_str()),
                    "submit rejected by server"
                );
                if let Some(problem) = &problem {
                    self.object.errors_from_problem(problem);
                }
                if let Some(handler) = &self.problem_handler {
                    handler(problem.clone()).await;
                }
                Ok(SubmitOutcome::Failed { status, problem })
            }
        }
    }

    fn enter_submit(&self) -> FormResult<()> {
        match self.options.submit_policy {
            SubmitPolicy::Reject => {
                if self
                    .in_flight
                    .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    tracing::warn!(
                        form_id = self.object.id().0,
                        "submit rejected while another is in flight"
                    );
                    return Err(FormError::AlreadySubmitting);
                }
            }
            SubmitPolicy::Allow => {
                self.in_flight.fetch_add(1, Ordering::SeqCst);
            }
        }
        self.submitting.set(true);
        Ok(())
    }
}

impl<T, R, P> Debug for FormAccessor<T, R, P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormAccessor")
            .field("object", &self.object)
            .field("options", &self.options)
            .field("in_flight", &self.in_flight.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
