//! Synchronous state-change notifications.
//!
//! Every mutation of [`StreamingState`] is delivered to every listener, in
//! subscription order, before the mutating call returns. There is no
//! coalescing. A panicking listener is logged and skipped; the others still
//! run.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::warn;

use crate::state::StreamingState;

/// A state-change callback.
pub type Listener = Box<dyn FnMut(&StreamingState) + Send>;

type SharedListener = Arc<Mutex<Listener>>;

/// Identifies one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    listeners: Vec<(SubscriberId, SharedListener)>,
}

impl ListenerTable {
    fn remove(&mut self, id: SubscriberId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }
}

/// The set of listeners attached to one engine.
#[derive(Default)]
pub struct SubscriberRegistry {
    table: Arc<Mutex<ListenerTable>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener. The returned [`Subscription`] removes it again.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&StreamingState) + Send + 'static,
    {
        let mut table = self.table.lock();
        let id = SubscriberId(table.next_id);
        table.next_id += 1;
        table
            .listeners
            .push((id, Arc::new(Mutex::new(Box::new(listener) as Listener))));

        Subscription {
            id,
            table: Arc::downgrade(&self.table),
        }
    }

    /// Delivers `state` to every listener. Returns how many returned normally.
    ///
    /// The listener list is copied before dispatch, so a listener may
    /// unsubscribe (itself or others) without deadlocking; removals take
    /// effect from the next notification.
    pub fn notify(&self, state: &StreamingState) -> usize {
        let listeners: Vec<(SubscriberId, SharedListener)> = self.table.lock().listeners.clone();

        let mut delivered = 0;
        for (id, listener) in listeners {
            let mut callback = listener.lock();
            match catch_unwind(AssertUnwindSafe(|| (*callback)(state))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    warn!(
                        subscriber = %id,
                        status = %state.status,
                        "Listener panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.table.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.table.lock().listeners.clear();
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Handle returned by [`SubscriberRegistry::subscribe`].
///
/// Dropping it does not unsubscribe; call [`Subscription::unsubscribe`].
#[derive(Debug, Clone)]
pub struct Subscription {
    id: SubscriberId,
    table: Weak<Mutex<ListenerTable>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Removes the listener. Returns `false` if it was already gone or the
    /// engine has been dropped.
    pub fn unsubscribe(&self) -> bool {
        match self.table.upgrade() {
            Some(table) => table.lock().remove(self.id),
            None => false,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
