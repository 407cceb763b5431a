#![forbid(unsafe_code)]

//! Command boundaries and merge decisions.
//!
//! The merger owns everything that happens between `begin_command` and
//! `end_command`: the open command and its buffered actions, the depth of
//! nested transparent scopes, the compound scope and the id of the last
//! group a command was recorded into. It never touches the stacks; it only
//! reads them to decide where a closed command goes.
//!
//! # Merge rules
//!
//! A closed command is appended to an existing group when:
//!
//! - a compound is open and its group is on top of the global undo side, or
//! - the top of the global undo side is the last recorded group, is a
//!   command group, carries the same non-empty merge id and was recorded by
//!   the same client.
//!
//! A transparent group on top of the global undo side is absorbed by the
//! next command instead. Anything else starts a new group.
//!
//! Protocol misuse (nested commands, unbalanced scopes, actions recorded
//! outside any command) is a programming error and panics.

use std::fmt;

use tracing::trace;

use crate::action::UndoableAction;
use crate::group::{CommandSpec, GroupId, GroupKind};
use crate::stacks::{Direction, HistoryStacks, StackKey};

/// Where a closed command is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeTarget {
    /// Start a new group.
    New,
    /// Append to an existing command group.
    Append(GroupId),
    /// Turn a transparent group into the command's group.
    Absorb(GroupId),
}

/// A command between `begin_command` and `end_command`.
pub(crate) struct PendingCommand {
    pub(crate) spec: CommandSpec,
    pub(crate) actions: Vec<Box<dyn UndoableAction>>,
}

impl fmt::Debug for PendingCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCommand")
            .field("spec", &self.spec)
            .field("actions", &self.actions.len())
            .finish()
    }
}

#[derive(Debug)]
struct Compound {
    name: String,
    group: Option<GroupId>,
}

/// Tracks command boundaries and decides merges.
#[derive(Default)]
pub struct CommandMerger {
    open: Option<PendingCommand>,
    transparent_depth: usize,
    transparent: Vec<Box<dyn UndoableAction>>,
    compound: Option<Compound>,
    last_group: Option<GroupId>,
}

impl fmt::Debug for CommandMerger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandMerger")
            .field("open", &self.open)
            .field("transparent_depth", &self.transparent_depth)
            .field("buffered", &self.transparent.len())
            .field("compound", &self.compound)
            .field("last_group", &self.last_group)
            .finish()
    }
}

impl CommandMerger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Command boundaries
    // ========================================================================

    /// Open a command.
    ///
    /// # Panics
    ///
    /// Panics if a command is already open.
    pub(crate) fn begin(&mut self, spec: CommandSpec) {
        if let Some(open) = &self.open {
            panic!(
                "begin_command('{}') called while command '{}' is still open",
                spec.name, open.spec.name
            );
        }
        self.open = Some(PendingCommand {
            spec,
            actions: Vec::new(),
        });
    }

    /// Whether a command is open.
    #[must_use]
    pub fn is_command_open(&self) -> bool {
        self.open.is_some()
    }

    /// Settings of the open command.
    #[must_use]
    pub fn open_spec(&self) -> Option<&CommandSpec> {
        self.open.as_ref().map(|open| &open.spec)
    }

    /// Mark the open command as global.
    ///
    /// # Panics
    ///
    /// Panics if no command is open.
    pub(crate) fn mark_global(&mut self) {
        let Some(open) = self.open.as_mut() else {
            panic!("mark_global called outside of a command");
        };
        open.spec.global = true;
    }

    /// Buffer an action into the open command or the transparent scope.
    ///
    /// # Panics
    ///
    /// Panics if neither a command nor a transparent scope is open.
    pub(crate) fn record(&mut self, action: Box<dyn UndoableAction>) {
        if let Some(open) = self.open.as_mut() {
            open.actions.push(action);
        } else if self.transparent_depth > 0 {
            self.transparent.push(action);
        } else {
            panic!(
                "action '{}' recorded outside of a command or transparent scope",
                action.debug_name()
            );
        }
    }

    /// Close the open command and hand back its buffered actions.
    ///
    /// # Panics
    ///
    /// Panics if no command is open.
    pub(crate) fn end(&mut self) -> PendingCommand {
        match self.open.take() {
            Some(pending) => pending,
            None => panic!("end_command called without begin_command"),
        }
    }

    // ========================================================================
    // Transparent scopes
    // ========================================================================

    pub(crate) fn begin_transparent(&mut self) {
        self.transparent_depth += 1;
    }

    /// Close one transparent scope.
    ///
    /// Returns the buffered actions once the outermost scope closes.
    ///
    /// # Panics
    ///
    /// Panics if no transparent scope is open.
    pub(crate) fn end_transparent(&mut self) -> Option<Vec<Box<dyn UndoableAction>>> {
        assert!(
            self.transparent_depth > 0,
            "end_transparent called without begin_transparent"
        );
        self.transparent_depth -= 1;
        if self.transparent_depth == 0 && !self.transparent.is_empty() {
            Some(std::mem::take(&mut self.transparent))
        } else {
            None
        }
    }

    /// Whether a transparent scope is open.
    #[must_use]
    pub fn in_transparent(&self) -> bool {
        self.transparent_depth > 0
    }

    /// Drain actions buffered by a transparent scope that is still open.
    pub(crate) fn take_transparent(&mut self) -> Vec<Box<dyn UndoableAction>> {
        std::mem::take(&mut self.transparent)
    }

    // ========================================================================
    // Compounds
    // ========================================================================

    /// Open a compound scope.
    ///
    /// # Panics
    ///
    /// Panics if a compound is already open.
    pub(crate) fn start_compound(&mut self, name: String) {
        if let Some(compound) = &self.compound {
            panic!(
                "start_compound('{name}') called while compound '{}' is still open",
                compound.name
            );
        }
        self.compound = Some(Compound { name, group: None });
        self.last_group = None;
    }

    /// Close the compound scope, returning its name and group.
    ///
    /// # Panics
    ///
    /// Panics if no compound is open.
    pub(crate) fn finish_compound(&mut self) -> (String, Option<GroupId>) {
        let Some(compound) = self.compound.take() else {
            panic!("finish_compound called without start_compound");
        };
        self.last_group = None;
        (compound.name, compound.group)
    }

    // ========================================================================
    // Merge state
    // ========================================================================

    /// Remember the group a command was just recorded into.
    pub(crate) fn note_group(&mut self, id: GroupId) {
        self.last_group = Some(id);
        if let Some(compound) = self.compound.as_mut() {
            compound.group = Some(id);
        }
    }

    /// Forget the last group so the next command starts a new one.
    pub(crate) fn break_merge(&mut self) {
        self.last_group = None;
    }

    /// Reset merge state after an undo or redo.
    ///
    /// An open compound also stops folding; later commands inside it start
    /// a fresh compound group.
    pub(crate) fn reset_after_replay(&mut self) {
        self.last_group = None;
        if let Some(compound) = self.compound.as_mut() {
            compound.group = None;
        }
    }

    /// Decide where a closed command with `spec` goes.
    #[must_use]
    pub fn decide(&self, spec: &CommandSpec, stacks: &HistoryStacks) -> MergeTarget {
        let Some(top_id) = stacks.top(&StackKey::Global, Direction::Undo) else {
            return MergeTarget::New;
        };
        let Some(top) = stacks.group(top_id) else {
            return MergeTarget::New;
        };

        if self
            .compound
            .as_ref()
            .is_some_and(|compound| compound.group == Some(top_id))
        {
            trace!(target: "rewind::merge", group = %top_id, "folded into compound");
            return MergeTarget::Append(top_id);
        }

        match top.kind() {
            GroupKind::Transparent => {
                trace!(target: "rewind::merge", group = %top_id, "absorbing transparent group");
                MergeTarget::Absorb(top_id)
            }
            GroupKind::Barrier => MergeTarget::New,
            GroupKind::Command => {
                let mergeable = self.last_group == Some(top_id)
                    && top.merge_id().is_some()
                    && top.merge_id() == spec.merge_id.as_deref()
                    && top.client() == spec.client;
                if mergeable {
                    trace!(target: "rewind::merge", group = %top_id, merge_id = ?spec.merge_id, "merged");
                    MergeTarget::Append(top_id)
                } else {
                    MergeTarget::New
                }
            }
        }
    }

    /// The group transparent actions attach to when no command is open.
    #[must_use]
    pub fn attach_target(&self, stacks: &HistoryStacks) -> Option<GroupId> {
        let last = self.last_group?;
        let top = stacks.top(&StackKey::Global, Direction::Undo)?;
        (top == last && stacks.group(last)?.kind() == GroupKind::Command).then_some(last)
    }
}
