//! The narrow observable-cell interface the accessor engine is built on.
//!
//! Hosts adapt their own reactive runtime (signals, observable streams, explicit pub/sub) by
//! implementing [`ReactiveCell`]. [`Signal`] is the in-process adapter used when no host cell
//! is injected.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SubscriptionId(pub u64);

pub type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub trait ReactiveCell<T>: Send + Sync {
    fn get(&self) -> T;
    fn set(&self, value: T);
    fn subscribe(&self, subscriber: Subscriber<T>) -> SubscriptionId;
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

struct SignalInner<T> {
    value: RwLock<T>,
    subscribers: RwLock<Vec<(SubscriptionId, Subscriber<T>)>>,
    next_subscription: AtomicU64,
}

/// Shared, clonable value cell. Clones alias the same value.
///
/// Subscribers run after the new value is committed, outside of any lock, so a subscriber may
/// read or write the signal again.
pub struct Signal<T> {
    inner: Arc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                value: RwLock::new(value),
                subscribers: RwLock::new(Vec::new()),
                next_subscription: AtomicU64::new(1),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    pub fn set(&self, value: T) {
        {
            *self.inner.value.write() = value;
        }
        self.notify();
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        {
            let mut value = self.inner.value.write();
            f(&mut value);
        }
        self.notify();
    }

    pub fn subscribe(&self, subscriber: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        self.subscribe_arc(Arc::new(subscriber))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn subscribe_arc(&self, subscriber: Subscriber<T>) -> SubscriptionId {
        let id = SubscriptionId(
            self.inner
                .next_subscription
                .fetch_add(1, Ordering::Relaxed),
        );
        self.inner.subscribers.write().push((id, subscriber));
        id
    }

    fn notify(&self) {
        let subscribers = self
            .inner
            .subscribers
            .read()
            .iter()
            .map(|(_, subscriber)| subscriber.clone())
            .collect::<Vec<_>>();
        if subscribers.is_empty() {
            return;
        }
        let value = self.get();
        for subscriber in subscribers {
            subscriber(&value);
        }
    }
}

impl<T> ReactiveCell<T> for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn get(&self) -> T {
        Signal::get(self)
    }

    fn set(&self, value: T) {
        Signal::set(self, value);
    }

    fn subscribe(&self, subscriber: Subscriber<T>) -> SubscriptionId {
        self.subscribe_arc(subscriber)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        Signal::unsubscribe(self, id)
    }
}

impl<T> Default for Signal<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Debug for Signal<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.inner.value.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn clones_alias_the_same_value() {
        let signal = Signal::new(1);
        let alias = signal.clone();
        alias.set(2);
        assert_eq!(signal.get(), 2);
        assert!(signal.ptr_eq(&alias));
    }

    #[test]
    fn subscribers_see_committed_value() {
        let signal = Signal::new(String::from("a"));
        let seen = Arc::new(RwLock::new(Vec::new()));
        {
            let seen = seen.clone();
            let reader = signal.clone();
            signal.subscribe(move |value: &String| {
                seen.write().push((value.clone(), reader.get()));
            });
        }
        signal.set("b".into());
        signal.update(|value| value.push('c'));
        assert_eq!(
            *seen.read(),
            vec![
                ("b".to_string(), "b".to_string()),
                ("bc".to_string(), "bc".to_string())
            ]
        );
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let signal = Signal::new(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let id = {
            let calls = calls.clone();
            signal.subscribe(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };
        signal.set(1);
        assert!(signal.unsubscribe(id));
        assert!(!signal.unsubscribe(id));
        signal.set(2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn subscriber_may_write_back_without_deadlock() {
        let signal = Signal::new(0);
        let writer = signal.clone();
        signal.subscribe(move |value: &i32| {
            if *value < 3 {
                writer.set(value + 1);
            }
        });
        signal.set(1);
        assert_eq!(signal.get(), 3);
    }
}
