#![forbid(unsafe_code)]

//! Synchronous history observers.
//!
//! Observers are handed to the manager at construction and called in
//! registration order, on the thread performing the operation, after the
//! histories have been updated.

use crate::group::{ClientId, CommandGroup, GroupId, GroupKind};
use crate::resource::ResourceRef;

/// Snapshot of a group handed to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub id: GroupId,
    pub kind: GroupKind,
    pub name: String,
    pub client: ClientId,
    pub resources: Vec<ResourceRef>,
}

impl From<&CommandGroup> for GroupSummary {
    fn from(group: &CommandGroup) -> Self {
        Self {
            id: group.id(),
            kind: group.kind(),
            name: group.name().to_string(),
            client: group.client(),
            resources: group.affected().to_vec(),
        }
    }
}

/// Receives history events. Every method defaults to a no-op.
pub trait UndoObserver: Send + Sync {
    /// A command was closed, either as a new group or merged into one.
    fn command_recorded(&mut self, _group: &GroupSummary) {}

    /// A step was undone; `groups` are in replay order.
    fn undone(&mut self, _groups: &[GroupSummary]) {}

    /// A step was redone; `groups` are in replay order.
    fn redone(&mut self, _groups: &[GroupSummary]) {}

    /// History bound to `resource` was discarded.
    fn history_invalidated(&mut self, _resource: &ResourceRef, _purged: &[GroupSummary]) {}
}
