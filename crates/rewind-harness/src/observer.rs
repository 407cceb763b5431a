#![forbid(unsafe_code)]

//! Observer that records history events.

use std::sync::{Arc, Mutex, PoisonError};

use rewind_core::{GroupSummary, ResourceRef, UndoObserver};

/// A history event as seen by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    Recorded { name: String },
    Undone { names: Vec<String> },
    Redone { names: Vec<String> },
    Invalidated { resource: String, purged: usize },
}

fn names(groups: &[GroupSummary]) -> Vec<String> {
    groups.iter().map(|group| group.name.clone()).collect()
}

/// Appends every callback to a shared log. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<HistoryEvent>>>,
}

impl RecordingObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<HistoryEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, event: HistoryEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl UndoObserver for RecordingObserver {
    fn command_recorded(&mut self, group: &GroupSummary) {
        self.push(HistoryEvent::Recorded {
            name: group.name.clone(),
        });
    }

    fn undone(&mut self, groups: &[GroupSummary]) {
        self.push(HistoryEvent::Undone {
            names: names(groups),
        });
    }

    fn redone(&mut self, groups: &[GroupSummary]) {
        self.push(HistoryEvent::Redone {
            names: names(groups),
        });
    }

    fn history_invalidated(&mut self, resource: &ResourceRef, purged: &[GroupSummary]) {
        self.push(HistoryEvent::Invalidated {
            resource: resource.label().to_string(),
            purged: purged.len(),
        });
    }
}
