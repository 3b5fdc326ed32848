//! The append-only wisdom buffer. Flushed either by batch-size threshold
//! or by the caller's periodic ticker; either way the buffer is swapped for
//! a fresh empty `Vec` under the lock, and network work happens after the
//! lock is released.

use parking_lot::Mutex;
use rmk_core::TranscriptEvent;
use std::collections::HashMap;

pub struct WisdomBuffer {
    events: Mutex<Vec<TranscriptEvent>>,
    batch_size: usize,
}

impl WisdomBuffer {
    #[must_use]
    pub fn new(batch_size: usize) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            batch_size,
        }
    }

    /// Appends one event. Returns `true` if the buffer has now reached the
    /// batch-size threshold and should be flushed.
    pub fn push(&self, event: TranscriptEvent) -> bool {
        let mut guard = self.events.lock();
        guard.push(event);
        guard.len() >= self.batch_size
    }

    /// Swaps out the buffer contents, releasing the lock immediately.
    /// Returns an empty `Vec` (not `None`) when there was nothing to flush,
    /// so callers can treat both paths uniformly.
    #[must_use]
    pub fn take(&self) -> Vec<TranscriptEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partitions a flushed batch by namespace. Cross-tenant summarization is
/// forbidden, so every downstream step operates on one of these groups at a
/// time.
#[must_use]
pub fn partition_by_namespace(
    events: Vec<TranscriptEvent>,
) -> HashMap<String, Vec<TranscriptEvent>> {
    let mut groups: HashMap<String, Vec<TranscriptEvent>> = HashMap::new();
    for event in events {
        groups
            .entry(event.namespace.as_str().to_string())
            .or_default()
            .push(event);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmk_core::Namespace;

    fn event(ns: &str) -> TranscriptEvent {
        TranscriptEvent::new(
            "c1",
            "u",
            Namespace::for_user(ns).unwrap(),
            "hello",
            "hi",
        )
    }

    #[test]
    fn push_signals_flush_at_batch_size() {
        let buf = WisdomBuffer::new(2);
        assert!(!buf.push(event("alice")));
        assert!(buf.push(event("alice")));
    }

    #[test]
    fn take_empties_the_buffer() {
        let buf = WisdomBuffer::new(10);
        buf.push(event("alice"));
        let taken = buf.take();
        assert_eq!(taken.len(), 1);
        assert!(buf.is_empty());
    }

    #[test]
    fn partitions_keep_tenants_separate() {
        let events = vec![event("alice"), event("bob"), event("alice")];
        let groups = partition_by_namespace(events);
        assert_eq!(groups.get("user_alice").unwrap().len(), 2);
        assert_eq!(groups.get("user_bob").unwrap().len(), 1);
    }
}
