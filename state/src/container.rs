//! Observable state container
//!
//! Holds one state tree, applies actions through the tree's pure reducer and
//! notifies subscribers after every transition. Dispatch is synchronous and
//! strictly ordered: actions are applied one at a time in call order.

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::cell::Cell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tasknest_core::Reducer;
use tracing::trace;

/// A single applied state change, as seen by subscribers
#[derive(Debug)]
pub struct Transition<'a, S: Reducer> {
    /// Monotonic counter of applied transitions
    pub version: u64,
    /// The applied action; `None` for a reset to defaults
    pub action: Option<&'a S::Action>,
    pub previous: &'a Arc<S>,
    pub current: &'a Arc<S>,
}

type Listener<S> = Arc<dyn Fn(&Transition<'_, S>) + Send + Sync>;

type ListenerList<S> = Mutex<Vec<(u64, Listener<S>)>>;

enum Command<A> {
    Apply(A),
    Reset,
}

struct Current<S> {
    version: u64,
    state: Arc<S>,
}

/// Handle returned by [`StateContainer::subscribe`].
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// State container for a reducer-driven state tree
pub struct StateContainer<S: Reducer> {
    current: RwLock<Current<S>>,
    queue: Mutex<VecDeque<Command<S::Action>>>,
    /// Held while draining the queue; the flag marks an active drain on this thread
    drain: ReentrantMutex<Cell<bool>>,
    listeners: Arc<ListenerList<S>>,
    next_listener: AtomicU64,
}

impl<S: Reducer> StateContainer<S> {
    pub fn new() -> Self {
        Self::with_state(S::default())
    }

    pub fn with_state(state: S) -> Self {
        Self {
            current: RwLock::new(Current {
                version: 0,
                state: Arc::new(state),
            }),
            queue: Mutex::new(VecDeque::new()),
            drain: ReentrantMutex::new(Cell::new(false)),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener: AtomicU64::new(0),
        }
    }

    /// Latest applied state. Never blocks on persistence.
    pub fn get_state(&self) -> Arc<S> {
        self.current.read().state.clone()
    }

    /// Number of transitions applied so far
    pub fn version(&self) -> u64 {
        self.current.read().version
    }

    /// Apply an action and notify every subscriber before returning.
    ///
    /// A listener that dispatches does not recurse: its action is queued and
    /// applied once the current transition's notifications are done.
    pub fn dispatch(&self, action: S::Action) {
        self.submit(Command::Apply(action));
    }

    /// Restore the compiled-in default state. Subscribers are notified with
    /// a transition whose `action` is `None`.
    pub fn reset(&self) {
        self.submit(Command::Reset);
    }

    /// Register a listener called after every transition
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Transition<'_, S>) + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(listener)));

        let registry: Weak<ListenerList<S>> = Arc::downgrade(&self.listeners);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(listeners) = registry.upgrade() {
                    listeners.lock().retain(|(listener_id, _)| *listener_id != id);
                }
            })),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn submit(&self, command: Command<S::Action>) {
        self.queue.lock().push_back(command);

        let draining = self.drain.lock();
        if draining.replace(true) {
            // Nested call from a listener; the outer drain picks it up
            return;
        }
        let _reset_flag = DrainFlag(&*draining);

        while let Some(command) = self.next_command() {
            self.apply(command);
        }
    }

    fn next_command(&self) -> Option<Command<S::Action>> {
        self.queue.lock().pop_front()
    }

    fn apply(&self, command: Command<S::Action>) {
        let (version, previous, next) = {
            let mut current = self.current.write();
            let next = match &command {
                Command::Apply(action) => Arc::new(current.state.reduce(action)),
                Command::Reset => Arc::new(S::default()),
            };
            let previous = std::mem::replace(&mut current.state, next.clone());
            current.version += 1;
            (current.version, previous, next)
        };

        let action = match &command {
            Command::Apply(action) => Some(action),
            Command::Reset => None,
        };
        trace!(version, ?action, "state transition applied");

        let transition = Transition {
            version,
            action,
            previous: &previous,
            current: &next,
        };

        let listeners: Vec<Listener<S>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&transition);
        }
    }
}

impl<S: Reducer> Default for StateContainer<S> {
    fn default() -> Self {
        Self::new()
    }
}

struct DrainFlag<'a>(&'a Cell<bool>);

impl Drop for DrainFlag<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Thread-safe container wrapper
pub type SharedStateContainer<S> = Arc<StateContainer<S>>;
