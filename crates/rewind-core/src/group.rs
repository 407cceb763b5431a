#![forbid(unsafe_code)]

//! Command groups: the unit of undo and redo.
//!
//! A [`CommandGroup`] is the ordered batch of actions produced by one
//! logical command. The engine shares one group object between the global
//! stack and the local stack of every resource the group touches.

use std::fmt;

use tracing::warn;

use crate::action::{ActionResult, UndoableAction};
use crate::resource::ResourceRef;

/// Identifier of a command group, unique within one manager.
///
/// Ids are allocated in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u64);

impl GroupId {
    /// Create a group id from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Participant that created a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClientId(pub u64);

impl ClientId {
    /// The host participant.
    pub const LOCAL: Self = Self(0);

    /// Create a client id from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::LOCAL {
            f.write_str("local")
        } else {
            write!(f, "client-{}", self.0)
        }
    }
}

/// How undoing or redoing a group should be confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmationPolicy {
    /// Ask for global or multi-resource groups, stay silent otherwise.
    #[default]
    Default,
    /// Always ask.
    Ask,
    /// Never ask.
    Silent,
}

impl ConfirmationPolicy {
    /// Combine two policies, keeping the more conservative one.
    #[must_use]
    pub fn strongest(self, other: Self) -> Self {
        match (self, other) {
            (Self::Ask, _) | (_, Self::Ask) => Self::Ask,
            (Self::Silent, _) | (_, Self::Silent) => Self::Silent,
            _ => Self::Default,
        }
    }
}

/// Kinds of group the histories hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// A closed command boundary.
    Command,
    /// Transparent actions that had no group to attach to. Never an undo
    /// step on its own; replayed with the command group beneath it.
    Transparent,
    /// Record of an external change. Undo cannot pass it.
    Barrier,
}

/// Parameters of a command boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Name shown in undo/redo menus.
    pub name: String,
    /// Consecutive commands with the same merge id coalesce.
    pub merge_id: Option<String>,
    /// Confirmation policy.
    pub policy: ConfirmationPolicy,
    /// Participant issuing the command.
    pub client: ClientId,
    /// Whether the command is global regardless of its actions.
    pub global: bool,
}

impl CommandSpec {
    /// Create a spec with the given name and default settings.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the merge id.
    #[must_use]
    pub fn with_merge_id(mut self, merge_id: impl Into<String>) -> Self {
        self.merge_id = Some(merge_id.into());
        self
    }

    /// Set the confirmation policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ConfirmationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the issuing participant.
    #[must_use]
    pub fn with_client(mut self, client: ClientId) -> Self {
        self.client = client;
        self
    }

    /// Mark the command as global.
    #[must_use]
    pub fn with_global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }
}

/// An ordered batch of actions created by one logical command.
pub struct CommandGroup {
    id: GroupId,
    kind: GroupKind,
    name: String,
    merge_id: Option<String>,
    policy: ConfirmationPolicy,
    global: bool,
    client: ClientId,
    actions: Vec<Box<dyn UndoableAction>>,
    affected: Vec<ResourceRef>,
}

impl fmt::Debug for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandGroup")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("merge_id", &self.merge_id)
            .field("global", &self.global)
            .field("client", &self.client)
            .field("actions", &self.actions.len())
            .field("affected", &self.affected)
            .finish()
    }
}

impl CommandGroup {
    pub(crate) fn new(id: GroupId, kind: GroupKind, spec: CommandSpec) -> Self {
        Self {
            id,
            kind,
            name: spec.name,
            merge_id: spec.merge_id,
            policy: spec.policy,
            global: spec.global,
            client: spec.client,
            actions: Vec::new(),
            affected: Vec::new(),
        }
    }

    pub(crate) fn barrier(id: GroupId, resource: ResourceRef) -> Self {
        let mut group = Self::new(id, GroupKind::Barrier, CommandSpec::new("External change"));
        group.affected.push(resource);
        group
    }

    /// Group id.
    #[must_use]
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Group kind.
    #[must_use]
    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    /// Whether the group is a leftover of transparent actions.
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.kind == GroupKind::Transparent
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Merge id, if any.
    #[must_use]
    pub fn merge_id(&self) -> Option<&str> {
        self.merge_id.as_deref()
    }

    /// Confirmation policy.
    #[must_use]
    pub fn policy(&self) -> ConfirmationPolicy {
        self.policy
    }

    /// Whether the group is global.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.global
    }

    /// Participant that created the group.
    #[must_use]
    pub fn client(&self) -> ClientId {
        self.client
    }

    /// Resources touched by the group, in order of first appearance.
    #[must_use]
    pub fn affected(&self) -> &[ResourceRef] {
        &self.affected
    }

    /// Whether the group touches `resource`.
    #[must_use]
    pub fn touches(&self, resource: &ResourceRef) -> bool {
        self.affected.contains(resource)
    }

    /// Number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the group holds no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Append an action whose canonical resources are `resources`.
    ///
    /// Returns the resources the group did not touch before.
    pub(crate) fn append(
        &mut self,
        action: Box<dyn UndoableAction>,
        resources: Vec<ResourceRef>,
    ) -> Vec<ResourceRef> {
        if action.is_global() {
            self.global = true;
        }
        let mut added = Vec::new();
        for resource in resources {
            if !self.affected.contains(&resource) {
                self.affected.push(resource.clone());
                added.push(resource);
            }
        }
        self.actions.push(action);
        added
    }

    /// Fold another command's settings into this group.
    pub(crate) fn merge_spec(&mut self, spec: &CommandSpec) {
        self.policy = self.policy.strongest(spec.policy);
        self.global |= spec.global;
    }

    /// Turn a transparent group into a command group named by `spec`.
    pub(crate) fn absorb_into_command(&mut self, spec: &CommandSpec) {
        self.kind = GroupKind::Command;
        self.name.clone_from(&spec.name);
        self.merge_id.clone_from(&spec.merge_id);
        self.policy = spec.policy;
        self.client = spec.client;
        self.global |= spec.global;
    }

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Report `to` instead of `from` as an affected resource.
    pub(crate) fn replace_resource(&mut self, from: &ResourceRef, to: &ResourceRef) {
        let Some(pos) = self.affected.iter().position(|r| r == from) else {
            return;
        };
        if self.affected.contains(to) {
            self.affected.remove(pos);
        } else {
            self.affected[pos] = to.clone();
        }
    }

    /// Undo every action in reverse order.
    ///
    /// On failure the actions already reverted are re-applied, so the group
    /// is left fully applied.
    pub(crate) fn undo(&mut self) -> ActionResult {
        for i in (0..self.actions.len()).rev() {
            if let Err(err) = self.actions[i].undo() {
                for action in &mut self.actions[i + 1..] {
                    if let Err(rollback) = action.redo() {
                        warn!(
                            target: "rewind::undo",
                            group = %self.id,
                            action = action.debug_name(),
                            error = %rollback,
                            "rollback failed"
                        );
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Redo every action in order.
    ///
    /// On failure the actions already re-applied are reverted again.
    pub(crate) fn redo(&mut self) -> ActionResult {
        for i in 0..self.actions.len() {
            if let Err(err) = self.actions[i].redo() {
                for action in self.actions[..i].iter_mut().rev() {
                    if let Err(rollback) = action.undo() {
                        warn!(
                            target: "rewind::undo",
                            group = %self.id,
                            action = action.debug_name(),
                            error = %rollback,
                            "rollback failed"
                        );
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionError, FnAction};
    use std::sync::{Arc, Mutex};

    fn push_char(buf: &Arc<Mutex<String>>, doc: &ResourceRef, ch: char) -> Box<dyn UndoableAction> {
        buf.lock().unwrap().push(ch);
        let (b1, b2) = (buf.clone(), buf.clone());
        Box::new(FnAction::new(
            vec![doc.clone()],
            move || {
                b1.lock().unwrap().pop();
                Ok(())
            },
            move || {
                b2.lock().unwrap().push(ch);
                Ok(())
            },
        ))
    }

    fn failing(doc: &ResourceRef) -> Box<dyn UndoableAction> {
        Box::new(FnAction::new(
            vec![doc.clone()],
            || Err(ActionError::new("boom")),
            || Err(ActionError::new("boom")),
        ))
    }

    #[test]
    fn undo_runs_in_reverse_and_redo_forward() {
        let buf = Arc::new(Mutex::new(String::new()));
        let doc = ResourceRef::new("doc");
        let mut group = CommandGroup::new(GroupId::new(1), GroupKind::Command, CommandSpec::new("Typing"));
        for ch in ['a', 'b', 'c'] {
            let action = push_char(&buf, &doc, ch);
            group.append(action, vec![doc.clone()]);
        }

        group.undo().unwrap();
        assert_eq!(*buf.lock().unwrap(), "");
        group.redo().unwrap();
        assert_eq!(*buf.lock().unwrap(), "abc");
    }

    #[test]
    fn failed_undo_rolls_back_partial_work() {
        let buf = Arc::new(Mutex::new(String::new()));
        let doc = ResourceRef::new("doc");
        let mut group = CommandGroup::new(GroupId::new(1), GroupKind::Command, CommandSpec::new("Mixed"));
        group.append(failing(&doc), vec![doc.clone()]);
        let action = push_char(&buf, &doc, 'x');
        group.append(action, vec![doc.clone()]);

        let err = group.undo().unwrap_err();
        assert_eq!(err.message(), "boom");
        assert_eq!(*buf.lock().unwrap(), "x");
    }

    #[test]
    fn append_reports_new_resources_once() {
        let buf = Arc::new(Mutex::new(String::new()));
        let a = ResourceRef::new("a");
        let b = ResourceRef::new("b");
        let mut group = CommandGroup::new(GroupId::new(1), GroupKind::Command, CommandSpec::new("Edit"));

        let first = push_char(&buf, &a, '1');
        assert_eq!(group.append(first, vec![a.clone()]), vec![a.clone()]);
        let second = push_char(&buf, &a, '2');
        assert!(group.append(second, vec![a.clone(), b.clone()]) == vec![b.clone()]);
        assert_eq!(group.affected(), &[a, b]);
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn policy_combination_prefers_ask() {
        use ConfirmationPolicy::*;
        assert_eq!(Default.strongest(Silent), Silent);
        assert_eq!(Silent.strongest(Ask), Ask);
        assert_eq!(Default.strongest(Default), Default);
    }

    #[test]
    fn absorbing_a_transparent_group_renames_it() {
        let mut group = CommandGroup::new(
            GroupId::new(3),
            GroupKind::Transparent,
            CommandSpec::default(),
        );
        group.absorb_into_command(
            &CommandSpec::new("Typing")
                .with_merge_id("typing")
                .with_client(ClientId::new(4)),
        );
        assert_eq!(group.kind(), GroupKind::Command);
        assert_eq!(group.name(), "Typing");
        assert_eq!(group.merge_id(), Some("typing"));
        assert_eq!(group.client(), ClientId::new(4));
    }
}
