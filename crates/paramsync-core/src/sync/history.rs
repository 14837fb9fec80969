use paramsync_types::SyncEvent;
use std::collections::VecDeque;

/// Size-bounded event log; the oldest entry is evicted once full.
#[derive(Debug, Clone)]
pub(crate) struct History {
    events: VecDeque<SyncEvent>,
    capacity: usize,
}

impl History {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { events: VecDeque::with_capacity(capacity.min(128)), capacity }
    }

    pub(crate) fn push(&mut self, event: SyncEvent) {
        if self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Most recent first.
    pub(crate) fn recent(&self, limit: Option<usize>) -> Vec<SyncEvent> {
        self.events.iter().rev().take(limit.unwrap_or(usize::MAX)).cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }
}
