//! Minimal reactive state container.
//!
//! A [`Store`] holds one value and synchronously notifies subscribers after
//! every write. The owner of the `Store` is the only writer; presentation
//! layers receive a [`StoreReader`] that can read and subscribe but never
//! write.
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A partial (or complete) update that can be merged into a state value.
pub trait Patch<S> {
    fn apply(self, state: &mut S);
}

/// A full value replaces the current state wholesale.
impl<S> Patch<S> for S {
    fn apply(self, state: &mut S) {
        *state = self;
    }
}

type Listener<S> = Rc<RefCell<dyn FnMut(&S)>>;

struct StoreInner<S> {
    state: S,
    listeners: Vec<(u64, Listener<S>)>,
    next_id: u64,
}

/// Handle returned by `subscribe`.
///
/// Dropping it leaves the subscription in place; call
/// [`Subscription::unsubscribe`] to remove the callback.
pub struct Subscription {
    remove: Box<dyn FnOnce() -> bool>,
}

impl Subscription {
    /// Remove the callback. Returns `false` if it was already gone.
    pub fn unsubscribe(self) -> bool {
        (self.remove)()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Observable holder for one state value.
pub struct Store<S> {
    inner: Rc<RefCell<StoreInner<S>>>,
}

/// Read-only view of a [`Store`].
pub struct StoreReader<S> {
    inner: Rc<RefCell<StoreInner<S>>>,
}

impl<S> Clone for StoreReader<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: Clone + 'static> Store<S> {
    #[must_use]
    pub fn new(initial: S) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                state: initial,
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Current value.
    #[must_use]
    pub fn get_state(&self) -> S {
        self.inner.borrow().state.clone()
    }

    /// Borrow the current value without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.borrow().state)
    }

    /// Merge `patch` into the current value, then notify subscribers.
    pub fn set_state(&self, patch: impl Patch<S>) {
        patch.apply(&mut self.inner.borrow_mut().state);
        notify(&self.inner);
    }

    /// Replace the value with `f(current)`, then notify subscribers.
    ///
    /// `f` must return a complete value.
    pub fn update(&self, f: impl FnOnce(&S) -> S) {
        let current = self.inner.borrow().state.clone();
        let next = f(&current);
        self.inner.borrow_mut().state = next;
        notify(&self.inner);
    }

    /// Register `listener` and invoke it once with the current value.
    pub fn subscribe(&self, listener: impl FnMut(&S) + 'static) -> Subscription {
        subscribe(&self.inner, listener)
    }

    /// Read-only handle for consumers.
    #[must_use]
    pub fn reader(&self) -> StoreReader<S> {
        StoreReader {
            inner: Rc::clone(&self.inner),
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

impl<S: Clone + 'static> StoreReader<S> {
    #[must_use]
    pub fn get_state(&self) -> S {
        self.inner.borrow().state.clone()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.borrow().state)
    }

    pub fn subscribe(&self, listener: impl FnMut(&S) + 'static) -> Subscription {
        subscribe(&self.inner, listener)
    }
}

fn subscribe<S: Clone + 'static>(
    inner: &Rc<RefCell<StoreInner<S>>>,
    listener: impl FnMut(&S) + 'static,
) -> Subscription {
    let listener: Listener<S> = Rc::new(RefCell::new(listener));
    let (id, snapshot) = {
        let mut guard = inner.borrow_mut();
        let id = guard.next_id;
        guard.next_id += 1;
        guard.listeners.push((id, Rc::clone(&listener)));
        (id, guard.state.clone())
    };
    (&mut *listener.borrow_mut())(&snapshot);

    let weak: Weak<RefCell<StoreInner<S>>> = Rc::downgrade(inner);
    Subscription {
        remove: Box::new(move || {
            weak.upgrade().is_some_and(|inner| {
                let mut guard = inner.borrow_mut();
                let before = guard.listeners.len();
                guard.listeners.retain(|(lid, _)| *lid != id);
                guard.listeners.len() != before
            })
        }),
    }
}

fn notify<S: Clone>(inner: &Rc<RefCell<StoreInner<S>>>) {
    // Release the store borrow before calling out so listeners can read,
    // write, or unsubscribe.
    let listeners: Vec<(u64, Listener<S>)> = inner
        .borrow()
        .listeners
        .iter()
        .map(|(id, listener)| (*id, Rc::clone(listener)))
        .collect();

    for (id, listener) in listeners {
        // Read the live value per listener: an earlier listener may have
        // written during this round.
        let snapshot = {
            let guard = inner.borrow();
            if !guard.listeners.iter().any(|(lid, _)| *lid == id) {
                continue;
            }
            guard.state.clone()
        };
        match listener.try_borrow_mut() {
            Ok(mut callback) => (&mut *callback)(&snapshot),
            Err(_) => log::warn!("subscriber {id} is already running; skipping nested notification"),
        }
    }
}
