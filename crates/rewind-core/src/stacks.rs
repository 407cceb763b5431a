#![forbid(unsafe_code)]

//! Bounded local and global history stacks.
//!
//! Groups live in one arena and the stacks hold their ids. A group that
//! touches several resources is referenced from the global stack and from
//! the local stack of each resource, and is reference counted by those
//! memberships: it is dropped when the last stack lets go of it.
//!
//! # Invariants
//!
//! 1. Every id on a stack names a live group in the arena
//! 2. A group's membership count equals the number of stack sides holding it
//! 3. `undo.len() <= limit` for every stack after a push
//! 4. The global order is a supersequence of every local order
//!
//! # Steps
//!
//! ```text
//! undo side: [g1, g2, t3, t4]        (t = transparent group)
//!   undo step   = [t4, t3, g2]
//! redo side after the step: [t4, t3, g2]
//!   redo step   = [g2, t3, t4]
//! ```
//!
//! An undo step is the run of transparent groups on top of the undo side
//! followed by the first non-transparent group. Moving the step pushes the
//! groups onto the redo side in the order they were undone, so the redo
//! step is the top of the redo side followed by the transparent groups
//! beneath it.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use tracing::trace;

use crate::group::{CommandGroup, GroupId, GroupKind};
use crate::observer::GroupSummary;
use crate::resource::ResourceRef;

/// Which stack an operation addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StackKey {
    /// The cross-resource history.
    Global,
    /// The history of one (canonical) resource.
    Local(ResourceRef),
}

impl fmt::Display for StackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Local(resource) => write!(f, "local:{resource}"),
        }
    }
}

/// Direction of a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Undo,
    Redo,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undo => f.write_str("undo"),
            Self::Redo => f.write_str("redo"),
        }
    }
}

/// Groups replayed together by one undo or redo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Groups in replay order.
    pub ids: Vec<GroupId>,
    /// The command group that names the step.
    pub principal: GroupId,
}

#[derive(Debug, Default)]
struct HistoryStack {
    undo: VecDeque<GroupId>,
    redo: VecDeque<GroupId>,
}

impl HistoryStack {
    fn side(&self, direction: Direction) -> &VecDeque<GroupId> {
        match direction {
            Direction::Undo => &self.undo,
            Direction::Redo => &self.redo,
        }
    }

    fn side_mut(&mut self, direction: Direction) -> &mut VecDeque<GroupId> {
        match direction {
            Direction::Undo => &mut self.undo,
            Direction::Redo => &mut self.redo,
        }
    }
}

struct Slot {
    group: CommandGroup,
    memberships: usize,
}

/// The global stack, the local stacks and the group arena they share.
pub struct HistoryStacks {
    groups: HashMap<GroupId, Slot>,
    global: HistoryStack,
    local: HashMap<ResourceRef, HistoryStack>,
    local_limit: usize,
    global_limit: usize,
}

impl fmt::Debug for HistoryStacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryStacks")
            .field("groups", &self.groups.len())
            .field("global_undo", &self.global.undo.len())
            .field("global_redo", &self.global.redo.len())
            .field("local_stacks", &self.local.len())
            .field("local_limit", &self.local_limit)
            .field("global_limit", &self.global_limit)
            .finish()
    }
}

impl HistoryStacks {
    /// Create empty stacks with the given depth limits (at least one).
    #[must_use]
    pub fn new(local_limit: usize, global_limit: usize) -> Self {
        Self {
            groups: HashMap::new(),
            global: HistoryStack::default(),
            local: HashMap::new(),
            local_limit: local_limit.max(1),
            global_limit: global_limit.max(1),
        }
    }

    // ========================================================================
    // Groups
    // ========================================================================

    /// Look up a live group.
    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&CommandGroup> {
        self.groups.get(&id).map(|slot| &slot.group)
    }

    pub(crate) fn group_mut(&mut self, id: GroupId) -> Option<&mut CommandGroup> {
        self.groups.get_mut(&id).map(|slot| &mut slot.group)
    }

    /// Number of live groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Record a closed group on the global stack and on the local stack of
    /// every resource it touches.
    ///
    /// Redo sides are cleared, except for transparent groups which never
    /// invalidate redo.
    pub fn push(&mut self, group: CommandGroup) {
        let id = group.id();
        let clear_redo = group.kind() != GroupKind::Transparent;
        let resources = group.affected().to_vec();
        self.groups.insert(
            id,
            Slot {
                group,
                memberships: 0,
            },
        );

        self.push_on(&StackKey::Global, id, clear_redo);
        for resource in resources {
            self.push_on(&StackKey::Local(resource), id, clear_redo);
        }
        trace!(
            target: "rewind::stacks",
            group = %id,
            undo_depth = self.global.undo.len(),
            redo_depth = self.global.redo.len(),
            "group pushed"
        );
        self.drop_if_orphaned(id);
    }

    /// Add an existing group to the local stacks of resources it gained
    /// through merging or transparent attachment.
    pub fn attach(&mut self, id: GroupId, resources: &[ResourceRef], clear_redo: bool) {
        for resource in resources {
            self.push_on(&StackKey::Local(resource.clone()), id, clear_redo);
        }
        self.drop_if_orphaned(id);
    }

    /// Create the local stack of `resource` if it does not exist yet.
    pub fn ensure_local(&mut self, resource: &ResourceRef) {
        self.local.entry(resource.clone()).or_default();
    }

    /// Whether a local stack exists for `resource`.
    #[must_use]
    pub fn has_local(&self, resource: &ResourceRef) -> bool {
        self.local.contains_key(resource)
    }

    fn push_on(&mut self, key: &StackKey, id: GroupId, clear_redo: bool) {
        let limit = match key {
            StackKey::Global => self.global_limit,
            StackKey::Local(_) => self.local_limit,
        };
        let stack = match key {
            StackKey::Global => &mut self.global,
            StackKey::Local(resource) => self.local.entry(resource.clone()).or_default(),
        };

        let cleared: Vec<GroupId> = if clear_redo {
            stack.redo.drain(..).collect()
        } else {
            Vec::new()
        };
        stack.undo.push_back(id);
        let mut evicted = Vec::new();
        while stack.undo.len() > limit {
            if let Some(old) = stack.undo.pop_front() {
                evicted.push(old);
            }
        }

        if let Some(slot) = self.groups.get_mut(&id) {
            slot.memberships += 1;
        }
        if !cleared.is_empty() {
            trace!(target: "rewind::stacks", stack = %key, cleared = cleared.len(), "redo side cleared");
        }
        for old in &evicted {
            trace!(target: "rewind::stacks", stack = %key, group = %old, "group evicted");
        }
        for old in cleared.into_iter().chain(evicted) {
            self.release(old);
        }
    }

    fn release(&mut self, id: GroupId) {
        let Some(slot) = self.groups.get_mut(&id) else {
            return;
        };
        slot.memberships = slot.memberships.saturating_sub(1);
        self.drop_if_orphaned(id);
    }

    fn drop_if_orphaned(&mut self, id: GroupId) {
        if self
            .groups
            .get(&id)
            .is_some_and(|slot| slot.memberships == 0)
        {
            self.groups.remove(&id);
            trace!(target: "rewind::stacks", group = %id, "group dropped");
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn stack(&self, key: &StackKey) -> Option<&HistoryStack> {
        match key {
            StackKey::Global => Some(&self.global),
            StackKey::Local(resource) => self.local.get(resource),
        }
    }

    fn kind_of(&self, id: GroupId) -> Option<GroupKind> {
        self.group(id).map(CommandGroup::kind)
    }

    /// The groups the next undo or redo on `key` would replay.
    #[must_use]
    pub fn step(&self, key: &StackKey, direction: Direction) -> Option<Step> {
        let side = self.stack(key)?.side(direction);
        let mut ids = Vec::new();
        match direction {
            Direction::Undo => {
                for &id in side.iter().rev() {
                    ids.push(id);
                    if self.kind_of(id) != Some(GroupKind::Transparent) {
                        return Some(Step { ids, principal: id });
                    }
                }
                None
            }
            Direction::Redo => {
                let mut iter = side.iter().rev();
                let principal = *iter.next()?;
                ids.push(principal);
                ids.extend(
                    iter.take_while(|&&id| self.kind_of(id) == Some(GroupKind::Transparent))
                        .copied(),
                );
                Some(Step { ids, principal })
            }
        }
    }

    /// Top of one side of `key`.
    #[must_use]
    pub fn top(&self, key: &StackKey, direction: Direction) -> Option<GroupId> {
        self.stack(key)?.side(direction).back().copied()
    }

    /// Whether an undo or redo step exists on `key`.
    #[must_use]
    pub fn is_available(&self, key: &StackKey, direction: Direction) -> bool {
        let Some(stack) = self.stack(key) else {
            return false;
        };
        match direction {
            Direction::Undo => stack
                .undo
                .iter()
                .any(|&id| self.kind_of(id) != Some(GroupKind::Transparent)),
            Direction::Redo => !stack.redo.is_empty(),
        }
    }

    /// Number of groups on one side of `key`.
    #[must_use]
    pub fn depth(&self, key: &StackKey, direction: Direction) -> usize {
        self.stack(key).map_or(0, |stack| stack.side(direction).len())
    }

    /// Resources whose local history diverged from the step.
    ///
    /// For every resource a group of the step touches, the step's groups
    /// that sit on that resource's local stack must be exactly its topmost
    /// entries. For undo, a step group that was evicted from a local stack
    /// is only replayable when nothing newer than it remains there.
    #[must_use]
    pub fn diverged(&self, step: &Step, direction: Direction) -> Vec<ResourceRef> {
        let mut resources: Vec<&ResourceRef> = Vec::new();
        for id in &step.ids {
            if let Some(group) = self.group(*id) {
                for resource in group.affected() {
                    if !resources.contains(&resource) {
                        resources.push(resource);
                    }
                }
            }
        }

        let mut diverged = Vec::new();
        for resource in resources {
            let Some(stack) = self.local.get(resource) else {
                continue;
            };
            let side = stack.side(direction);
            let members: Vec<GroupId> = step
                .ids
                .iter()
                .copied()
                .filter(|id| side.contains(id))
                .collect();
            let on_top = side.iter().rev().take(members.len()).eq(members.iter());

            let evicted_ok = direction == Direction::Redo
                || step.ids.iter().all(|id| {
                    members.contains(id)
                        || !self.group(*id).is_some_and(|g| g.touches(resource))
                        || side.iter().all(|other| members.contains(other) || other < id)
                });

            if !on_top || !evicted_ok {
                diverged.push(resource.clone());
            }
        }
        diverged
    }

    // ========================================================================
    // Replay bookkeeping
    // ========================================================================

    /// Move the groups of a replayed step to the opposite side of every
    /// stack holding them.
    pub fn move_step(&mut self, step: &Step, direction: Direction) {
        let target = match direction {
            Direction::Undo => Direction::Redo,
            Direction::Redo => Direction::Undo,
        };
        for &id in &step.ids {
            let resources = self
                .group(id)
                .map(|group| group.affected().to_vec())
                .unwrap_or_default();
            move_between(&mut self.global, id, direction, target);
            for resource in &resources {
                if let Some(stack) = self.local.get_mut(resource) {
                    move_between(stack, id, direction, target);
                }
            }
        }
        trace!(
            target: "rewind::stacks",
            %direction,
            groups = step.ids.len(),
            undo_depth = self.global.undo.len(),
            redo_depth = self.global.redo.len(),
            "step moved"
        );
    }

    /// Clear the redo side of every stack holding `id`.
    ///
    /// Used when a group that was recorded without invalidating redo turns
    /// into a regular command.
    pub fn clear_redo_for(&mut self, id: GroupId) {
        let resources = self
            .group(id)
            .map(|group| group.affected().to_vec())
            .unwrap_or_default();
        let mut cleared: Vec<GroupId> = self.global.redo.drain(..).collect();
        for resource in &resources {
            if let Some(stack) = self.local.get_mut(resource) {
                cleared.extend(stack.redo.drain(..));
            }
        }
        if !cleared.is_empty() {
            trace!(target: "rewind::stacks", group = %id, cleared = cleared.len(), "redo sides cleared");
        }
        for old in cleared {
            self.release(old);
        }
    }

    // ========================================================================
    // Invalidation
    // ========================================================================

    /// Forget the history of `resource`.
    ///
    /// Every non-global group touching it is removed from all stacks; global
    /// groups stay on the global stack. When `keep_stack` is false the local
    /// stack itself is destroyed. Returns summaries of the purged groups.
    pub fn invalidate(&mut self, resource: &ResourceRef, keep_stack: bool) -> Vec<GroupSummary> {
        let mut doomed: Vec<GroupId> = self
            .groups
            .values()
            .filter(|slot| slot.group.touches(resource) && !slot.group.is_global())
            .map(|slot| slot.group.id())
            .collect();
        doomed.sort();
        let summaries: Vec<GroupSummary> = doomed
            .iter()
            .filter_map(|id| self.group(*id))
            .map(GroupSummary::from)
            .collect();

        if let Some(stack) = self.local.remove(resource) {
            for id in stack.undo.into_iter().chain(stack.redo) {
                self.release(id);
            }
        }
        for id in doomed {
            let resources = self
                .group(id)
                .map(|group| group.affected().to_vec())
                .unwrap_or_default();
            let mut removed = remove_everywhere(&mut self.global, id);
            for other in &resources {
                if let Some(stack) = self.local.get_mut(other) {
                    removed += remove_everywhere(stack, id);
                }
            }
            for _ in 0..removed {
                self.release(id);
            }
        }

        if keep_stack {
            self.ensure_local(resource);
        }
        trace!(
            target: "rewind::stacks",
            resource = %resource,
            purged = summaries.len(),
            "resource history invalidated"
        );
        summaries
    }

    /// Hand the history of `from` over to `to`.
    ///
    /// Groups touching `from` report `to` instead, and the local stack of
    /// `from` is merged into the one of `to` in creation order. Groups that
    /// were on both stacks keep a single membership.
    pub fn rekey(&mut self, from: &ResourceRef, to: &ResourceRef) {
        for slot in self.groups.values_mut() {
            slot.group.replace_resource(from, to);
        }
        let Some(moved) = self.local.remove(from) else {
            return;
        };
        let limit = self.local_limit;
        let stack = self.local.entry(to.clone()).or_default();

        let mut released = Vec::new();
        for id in moved.undo {
            if stack.undo.contains(&id) {
                released.push(id);
            } else {
                stack.undo.push_back(id);
            }
        }
        for id in moved.redo {
            if stack.redo.contains(&id) {
                released.push(id);
            } else {
                stack.redo.push_back(id);
            }
        }
        stack.undo.make_contiguous().sort_unstable();
        stack.redo.make_contiguous().sort_unstable_by(|a, b| b.cmp(a));
        while stack.undo.len() > limit {
            if let Some(old) = stack.undo.pop_front() {
                released.push(old);
            }
        }

        trace!(
            target: "rewind::stacks",
            %from,
            %to,
            released = released.len(),
            "local history handed over"
        );
        for id in released {
            self.release(id);
        }
    }

    /// Remove every group from every stack.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.global = HistoryStack::default();
        for stack in self.local.values_mut() {
            *stack = HistoryStack::default();
        }
    }
}

fn move_between(stack: &mut HistoryStack, id: GroupId, from: Direction, to: Direction) {
    let side = stack.side_mut(from);
    if let Some(pos) = side.iter().rposition(|&other| other == id) {
        side.remove(pos);
        stack.side_mut(to).push_back(id);
    }
}

fn remove_everywhere(stack: &mut HistoryStack, id: GroupId) -> usize {
    let before = stack.undo.len() + stack.redo.len();
    stack.undo.retain(|&other| other != id);
    stack.redo.retain(|&other| other != id);
    before - (stack.undo.len() + stack.redo.len())
}
