//! Observer registry for "unresolved conflict count changed" events.
//!
//! Resolvers own one [`CountListeners`] each and call [`CountListeners::notify`]
//! whenever their derived conflict count moves. Callers use the event to
//! enable or disable a commit action.

use std::fmt;

/// Handle returned by [`CountListeners::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type CountCallback = Box<dyn FnMut(usize, usize)>;

/// Callbacks invoked with `(old_count, new_count)`.
#[derive(Default)]
pub struct CountListeners {
    next_id: u64,
    listeners: Vec<(ListenerId, CountCallback)>,
}

impl CountListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, callback: impl FnMut(usize, usize) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(callback)));
        id
    }

    /// Returns `true` if a listener was registered under `id`.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Invoke every listener in subscription order, unless nothing changed.
    pub fn notify(&mut self, old: usize, new: usize) {
        if old == new {
            return;
        }
        for (_, callback) in &mut self.listeners {
            callback(old, new);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for CountListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountListeners")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
