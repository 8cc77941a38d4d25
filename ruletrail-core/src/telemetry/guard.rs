//! Exactly-once commit for a unit of work's record.

use tracing::{debug, warn};

use super::record::RecordHandle;
use super::sink::{Level, Sink};

/// Commits the record exactly once.
///
/// If the unit of work never finishes (its future is dropped on
/// cancellation or a panic unwinds through it) the record is still
/// committed, at `error` level and flagged `aborted`.
pub(crate) struct EmissionGuard<'a, S: Sink + ?Sized> {
    record: RecordHandle,
    sink: &'a S,
    committed: bool,
}

impl<'a, S: Sink + ?Sized> EmissionGuard<'a, S> {
    pub(crate) fn new(record: RecordHandle, sink: &'a S) -> Self {
        Self {
            record,
            sink,
            committed: false,
        }
    }

    pub(crate) fn commit(&mut self, level: Level) {
        if self.committed {
            return;
        }
        self.committed = true;
        debug!(%level, "committing telemetry");
        self.sink.commit(self.record.emit(level));
    }
}

impl<S: Sink + ?Sized> Drop for EmissionGuard<'_, S> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        self.committed = true;

        let panicking = std::thread::panicking();
        warn!(panicking, "unit of work did not complete, committing partial telemetry");

        let mut event = self.record.emit(Level::Error).bool("aborted", true);
        if panicking {
            event = event.bool("panicked", true);
        }
        self.sink.commit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::sink::{FieldValue, MemorySink};
    use std::sync::Arc;

    #[test]
    fn test_guard_commits_once() {
        let sink = MemorySink::new();
        let mut guard = EmissionGuard::new(RecordHandle::new(), &sink);
        guard.commit(Level::Info);
        guard.commit(Level::Error);
        drop(guard);

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.events()[0].level(), Level::Info);
    }

    #[test]
    fn test_dropped_guard_commits_aborted() {
        let memory = Arc::new(MemorySink::new());
        let sink: Arc<dyn Sink> = memory.clone();
        drop(EmissionGuard::new(RecordHandle::new(), &*sink));

        let events = memory.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level(), Level::Error);
        assert_eq!(events[0].get("aborted"), Some(&FieldValue::Bool(true)));
        assert!(!events[0].has("panicked"));
    }
}
