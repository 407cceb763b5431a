#![forbid(unsafe_code)]

//! Error and outcome types for undo/redo requests.
//!
//! Routine "nothing to do" answers and declined confirmations are
//! [`UndoOutcome`] values, not errors. [`UndoError`] is reserved for requests
//! that were refused or failed part-way; in every case the histories are
//! left as they were before the request.

use std::fmt;

use thiserror::Error;

use crate::action::ActionError;
use crate::group::GroupId;
use crate::resource::ResourceRef;
use crate::stacks::Direction;

/// Why an undo or redo was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// A resource of the group has newer, unrelated history on top.
    AlreadyChanged,
    /// The group belongs to a different participant.
    ForeignChange,
    /// The history is blocked by a recorded external change.
    ExternallyChanged,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyChanged => {
                f.write_str("files affected by this action have been already changed")
            }
            Self::ForeignChange => f.write_str("conflicting change"),
            Self::ExternallyChanged => {
                f.write_str("files affected by this action have been changed externally")
            }
        }
    }
}

/// Errors returned by undo/redo requests and link management.
#[derive(Debug, Error)]
pub enum UndoError {
    /// The request conflicts with the current state of the histories.
    #[error("{}{}", describe_conflict(.kind, .direction), describe_resources(.resources))]
    Conflict {
        kind: ConflictKind,
        direction: Direction,
        resources: Vec<ResourceRef>,
    },
    /// An action failed while the group was being replayed.
    #[error("replaying group {group} failed")]
    Action {
        group: GroupId,
        #[source]
        source: ActionError,
    },
    /// A copy/original link was refused.
    #[error("cannot link {copy} to {original}: {reason}")]
    InvalidLink {
        copy: ResourceRef,
        original: ResourceRef,
        reason: &'static str,
    },
}

impl UndoError {
    /// The conflict kind, if this is a conflict.
    #[must_use]
    pub fn conflict_kind(&self) -> Option<ConflictKind> {
        match self {
            Self::Conflict { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

fn describe_conflict(kind: &ConflictKind, direction: &Direction) -> String {
    match kind {
        ConflictKind::ForeignChange => format!("cannot {direction}: {kind}"),
        _ => kind.to_string(),
    }
}

fn describe_resources(resources: &[ResourceRef]) -> String {
    if resources.is_empty() {
        return String::new();
    }
    let labels: Vec<&str> = resources.iter().map(ResourceRef::label).collect();
    format!(": {}", labels.join(", "))
}

/// Result of an undo or redo request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    /// The step was replayed; `name` is the name of its command.
    Applied { name: String },
    /// The selected stack had nothing to replay.
    Unavailable,
    /// The confirmer aborted the request.
    Declined,
}

impl UndoOutcome {
    /// Whether the step was replayed.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}
