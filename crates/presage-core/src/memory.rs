use std::collections::VecDeque;

use crate::event::Event;

/// Ordered buffer of canonical events since the last clear, scoped to one
/// processor context. Ephemeral by design: never persisted.
///
/// Sequence order is append order; no reordering, no deduplication. An
/// optional capacity evicts the oldest event on append once full.
#[derive(Clone, Debug, Default)]
pub struct WorkingMemory {
    events: VecDeque<Event>,
    capacity: Option<usize>,
}

impl WorkingMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounded(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: Some(capacity),
        }
    }

    /// Append one event, evicting the oldest if at capacity.
    pub fn append(&mut self, event: Event) {
        if let Some(cap) = self.capacity {
            while self.events.len() >= cap {
                self.events.pop_front();
            }
        }
        self.events.push_back(event);
    }

    /// Immutable ordered copy for learning and prediction.
    pub fn snapshot(&self) -> Vec<Event> {
        self.events.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Change the capacity, evicting oldest events if the buffer is over
    /// the new bound. `None` removes the bound.
    pub fn set_capacity(&mut self, capacity: Option<usize>) {
        self.capacity = capacity;
        if let Some(cap) = capacity {
            while self.events.len() > cap {
                self.events.pop_front();
            }
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
