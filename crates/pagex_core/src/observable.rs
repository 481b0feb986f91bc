//! Observable values
//!
//! A single-threaded value cell with change subscribers. Pages expose their
//! enter/exit progress as observables so content can react to it without
//! polling.
//!
//! Notification is reentrancy-safe: subscribers are snapshotted before they
//! run, so a subscriber may read the observable, subscribe, or drop its own
//! subscription while being notified.
//!
//! # Example
//!
//! ```rust
//! use pagex_core::observable::Observable;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let progress = Observable::new(0.0f32);
//! let seen = Rc::new(Cell::new(0.0));
//!
//! let sink = seen.clone();
//! let _sub = progress.subscribe(move |value| sink.set(*value));
//!
//! progress.set(0.5);
//! assert_eq!(seen.get(), 0.5);
//! ```

use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

new_key_type! {
    /// Identifier for an observable subscriber
    pub struct SubscriberId;
}

type Callback<T> = Rc<dyn Fn(&T)>;

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: SlotMap<SubscriberId, Callback<T>>,
}

/// A shared, observable value (cheap to clone)
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: SlotMap::with_key(),
            })),
        }
    }

    /// Get the current value
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Number of writes since creation
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Replace the value and notify every subscriber
    pub fn set(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.value = value.clone();
            inner.version += 1;
        }
        self.notify(&value);
    }

    /// Subscribe to changes
    ///
    /// The callback runs on every subsequent write until the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        let id = self
            .inner
            .borrow_mut()
            .subscribers
            .insert(Rc::new(callback));

        let weak: Weak<RefCell<ObservableInner<T>>> = Rc::downgrade(&self.inner);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().subscribers.remove(id);
                }
            })),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    fn notify(&self, value: &T) {
        let snapshot: Vec<(SubscriberId, Callback<T>)> = self
            .inner
            .borrow()
            .subscribers
            .iter()
            .map(|(id, callback)| (id, Rc::clone(callback)))
            .collect();

        for (id, callback) in snapshot {
            // An earlier subscriber may have torn this one down
            if self.inner.borrow().subscribers.contains_key(id) {
                callback(value);
            }
        }
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Write only if the value differs, returning whether it changed
    pub fn set_if_changed(&self, value: T) -> bool {
        if self.inner.borrow().value == value {
            return false;
        }
        self.set(value);
        true
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

/// Handle that unsubscribes when dropped
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Unsubscribe now
    pub fn cancel(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }

    /// Keep the subscription alive for the lifetime of the observable
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_get_set() {
        let value = Observable::new(1);
        assert_eq!(value.get(), 1);
        value.set(2);
        assert_eq!(value.get(), 2);
        assert_eq!(value.version(), 1);
    }

    #[test]
    fn test_subscribe_and_drop() {
        let value = Observable::new(0);
        let calls = Rc::new(Cell::new(0));

        let counter = calls.clone();
        let sub = value.subscribe(move |_| counter.set(counter.get() + 1));
        value.set(1);
        value.set(2);
        assert_eq!(calls.get(), 2);

        drop(sub);
        value.set(3);
        assert_eq!(calls.get(), 2);
        assert_eq!(value.subscriber_count(), 0);
    }

    #[test]
    fn test_set_if_changed() {
        let value = Observable::new(Some(0.5f32));
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let _sub = value.subscribe(move |_| counter.set(counter.get() + 1));

        assert!(!value.set_if_changed(Some(0.5)));
        assert!(value.set_if_changed(None));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_reentrant_read_during_notify() {
        let value = Observable::new(0);
        let reader = value.clone();
        let seen = Rc::new(Cell::new(-1));
        let sink = seen.clone();
        let _sub = value.subscribe(move |_| sink.set(reader.get()));

        value.set(7);
        assert_eq!(seen.get(), 7);
    }

    #[test]
    fn test_subscription_outlives_observable() {
        let sub = {
            let value = Observable::new(0);
            value.subscribe(|_| {})
        };
        // Dropping after the observable is gone must not panic
        drop(sub);
    }
}
