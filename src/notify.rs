//! Change Notification Module
//!
//! Registry of listeners told about property changes. Listeners may add or
//! remove listeners while a change is being delivered.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::cache::{Hvo, Tag};

/// Describes one property change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropChange {
    pub hvo: Hvo,
    pub tag: Tag,
    /// First affected index (0 for non-vector properties)
    pub index: usize,
    pub inserted: usize,
    pub deleted: usize,
}

impl PropChange {
    pub fn new(hvo: Hvo, tag: Tag, index: usize, inserted: usize, deleted: usize) -> Self {
        Self {
            hvo,
            tag,
            index,
            inserted,
            deleted,
        }
    }

    /// Change of a single-valued property.
    pub fn simple(hvo: Hvo, tag: Tag) -> Self {
        Self::new(hvo, tag, 0, 0, 0)
    }
}

/// Receives property change notifications.
pub trait ChangeListener {
    /// Called once per change. `registry` may be used to add or remove listeners.
    fn prop_changed(&self, change: &PropChange, registry: &NotifierRegistry);
}

/// Handle returned when a listener is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Registered = (ListenerId, Rc<dyn ChangeListener>);

#[derive(Default)]
pub struct NotifierRegistry {
    listeners: RefCell<Vec<Registered>>,
    next_id: Cell<u64>,
}

impl NotifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Rc<dyn ChangeListener>) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    /// Unregisters a listener. Returns false if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }

    /// Notifies every registered listener.
    pub fn notify_all(&self, change: &PropChange) {
        self.deliver(change, &mut HashSet::new());
    }

    /// Notifies `first` before any other listener, then all the others.
    pub fn notify_first(&self, first: ListenerId, change: &PropChange) {
        let mut delivered = HashSet::new();
        let listener = self
            .listeners
            .borrow()
            .iter()
            .find(|(id, _)| *id == first)
            .map(|(_, listener)| Rc::clone(listener));
        if let Some(listener) = listener {
            delivered.insert(first);
            listener.prop_changed(change, self);
        }
        self.deliver(change, &mut delivered);
    }

    // The listener list may change under each callback, so the scan restarts
    // after every delivery and the delivered set prevents repeats.
    fn deliver(&self, change: &PropChange, delivered: &mut HashSet<ListenerId>) {
        trace!(?change, listeners = self.len(), "delivering change");
        loop {
            let next = self
                .listeners
                .borrow()
                .iter()
                .find(|(id, _)| !delivered.contains(id))
                .map(|(id, listener)| (*id, Rc::clone(listener)));
            let Some((id, listener)) = next else {
                break;
            };
            delivered.insert(id);
            listener.prop_changed(change, self);
        }
    }
}

impl fmt::Debug for NotifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifierRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}
