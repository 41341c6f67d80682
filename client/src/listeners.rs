use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Callback<T> = Rc<dyn Fn(&T)>;

struct Registry<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

/// Single-threaded observer list. Callbacks run synchronously in
/// registration order.
pub struct Listeners<T> {
    registry: Rc<RefCell<Registry<T>>>,
}

impl<T: 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Listeners<T> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.push((id, Rc::new(callback)));
            id
        };

        let weak: Weak<RefCell<Registry<T>>> = Rc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = weak.upgrade() {
                registry.borrow_mut().entries.retain(|(entry, _)| *entry != id);
            }
        })
    }

    pub fn notify(&self, value: &T) {
        // Snapshot first so a callback may subscribe or unsubscribe.
        let callbacks: Vec<Callback<T>> = self
            .registry
            .borrow()
            .entries
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(value);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Disposer returned by every `subscribe`. Unsubscribes when dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new<F: FnOnce() + 'static>(dispose: F) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    pub fn dispose(mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.dispose.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn dropped_subscription_stops_delivery() {
        let listeners = Listeners::<u32>::new();
        let seen = Rc::new(Cell::new(0));

        let sink = Rc::clone(&seen);
        let subscription = listeners.subscribe(move |value| sink.set(sink.get() + value));
        listeners.notify(&2);
        assert_eq!(seen.get(), 2);

        drop(subscription);
        listeners.notify(&5);
        assert_eq!(seen.get(), 2);
        assert!(listeners.is_empty());
    }

    #[test]
    fn explicit_dispose_only_removes_its_own_entry() {
        let listeners = Listeners::<()>::new();
        let first = listeners.subscribe(|_| {});
        let _second = listeners.subscribe(|_| {});
        first.dispose();
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn subscription_outliving_registry_is_harmless() {
        let listeners = Listeners::<()>::new();
        let subscription = listeners.subscribe(|_| {});
        drop(listeners);
        drop(subscription);
    }
}
