// Explicit subscribe/unsubscribe registry.
// Replaces global window listeners: every subscription has an id and must be removed by its owner.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

/// Handle returned by `Listeners::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ListenerId {
    fn from(raw: u64) -> Self {
        ListenerId(raw)
    }
}

/// Ordered set of callbacks for events of type `E`.
pub struct Listeners<E: ?Sized> {
    next_id: u64,
    entries: Vec<(ListenerId, Box<dyn FnMut(&E)>)>,
}

impl<E: ?Sized> Listeners<E> {
    pub fn new() -> Self {
        Listeners {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(callback)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Invoke callbacks in subscription order.
    pub fn emit(&mut self, event: &E) {
        for (_, callback) in &mut self.entries {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E: ?Sized> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.entries.len())
            .finish()
    }
}

/// Scoped subscription to a shared registry. Unsubscribes when dropped.
/// Holds the registry weakly, so whichever side is dropped first, nothing is left behind.
pub struct Subscription<E: ?Sized> {
    registry: Weak<RefCell<Listeners<E>>>,
    id: ListenerId,
}

impl<E: ?Sized> Subscription<E> {
    pub fn new(
        registry: &Rc<RefCell<Listeners<E>>>,
        callback: impl FnMut(&E) + 'static,
    ) -> Self {
        let id = registry.borrow_mut().subscribe(callback);
        Subscription {
            registry: Rc::downgrade(registry),
            id,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// False once the registry itself has been dropped.
    pub fn is_live(&self) -> bool {
        self.registry.strong_count() > 0
    }
}

impl<E: ?Sized> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            match registry.try_borrow_mut() {
                Ok(mut listeners) => {
                    listeners.unsubscribe(self.id);
                }
                // Dropped from inside one of the registry's own callbacks.
                Err(_) => tracing::warn!(id = self.id.0, "Listener outlived its subscription"),
            }
        }
    }
}

impl<E: ?Sized> fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}

/// Viewport resize notification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizeEvent {
    pub width: f32,
    pub height: f32,
}

/// Host-owned viewport event source. Components subscribe for their lifetime.
pub type ViewportEvents = Listeners<ResizeEvent>;

/// Shared handle to a `ViewportEvents` registry for scoped subscriptions.
pub type SharedViewportEvents = Rc<RefCell<ViewportEvents>>;
