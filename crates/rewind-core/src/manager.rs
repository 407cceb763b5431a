#![forbid(unsafe_code)]

//! The [`UndoManager`] facade.
//!
//! The manager ties the pieces together: commands flow through the
//! [`CommandMerger`] into the [`HistoryStacks`], undo and redo requests
//! select a step on a stack, check it for conflicts, ask the injected
//! [`Confirmer`] when the step's policies require it, replay the groups and
//! move them to the opposite side.
//!
//! # Example
//!
//! ```ignore
//! let mut undo = UndoManager::builder()
//!     .config(UndoConfig::default().with_global_limit(50))
//!     .confirmer(|message: &str| ask_user(message))
//!     .observer(StatusBar::default())
//!     .build();
//!
//! undo.execute_command(CommandSpec::new("Typing").with_merge_id("typing"), |undo| {
//!     undo.record(Box::new(insert(&doc, 0, "x")));
//! });
//! undo.undo(&doc)?;
//! ```

use std::fmt;

use tracing::{debug, debug_span, trace, warn};

use crate::action::UndoableAction;
use crate::config::UndoConfig;
use crate::confirm::{AlwaysProceed, Confirmation, ConfirmationResolver, Confirmer, Decision};
use crate::error::{ConflictKind, UndoError, UndoOutcome};
use crate::group::{ClientId, CommandGroup, CommandSpec, GroupId, GroupKind};
use crate::merger::{CommandMerger, MergeTarget};
use crate::observer::{GroupSummary, UndoObserver};
use crate::resource::{ResourceLinks, ResourceRef};
use crate::stacks::{Direction, HistoryStacks, StackKey};

/// Which history an undo/redo request or query addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// The global history.
    Global,
    /// The local history of a resource (or of its original, if linked).
    Resource(ResourceRef),
}

impl From<ResourceRef> for Target {
    fn from(resource: ResourceRef) -> Self {
        Self::Resource(resource)
    }
}

impl From<&ResourceRef> for Target {
    fn from(resource: &ResourceRef) -> Self {
        Self::Resource(resource.clone())
    }
}

impl From<Option<ResourceRef>> for Target {
    fn from(resource: Option<ResourceRef>) -> Self {
        resource.map_or(Self::Global, Self::Resource)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`UndoManager`].
pub struct UndoManagerBuilder {
    config: UndoConfig,
    confirmer: Box<dyn Confirmer>,
    observers: Vec<Box<dyn UndoObserver>>,
}

impl Default for UndoManagerBuilder {
    fn default() -> Self {
        Self {
            config: UndoConfig::default(),
            confirmer: Box::new(AlwaysProceed),
            observers: Vec::new(),
        }
    }
}

impl fmt::Debug for UndoManagerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoManagerBuilder")
            .field("config", &self.config)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl UndoManagerBuilder {
    /// Set the history limits.
    #[must_use]
    pub fn config(mut self, config: UndoConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the confirmer asked before steps that need consent.
    #[must_use]
    pub fn confirmer(mut self, confirmer: impl Confirmer + 'static) -> Self {
        self.confirmer = Box::new(confirmer);
        self
    }

    /// Register an observer. Observers are called in registration order.
    #[must_use]
    pub fn observer(mut self, observer: impl UndoObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    #[must_use]
    pub fn build(self) -> UndoManager {
        UndoManager {
            stacks: HistoryStacks::new(self.config.local_limit, self.config.global_limit),
            config: self.config,
            merger: CommandMerger::new(),
            links: ResourceLinks::new(),
            confirmer: self.confirmer,
            observers: self.observers,
            next_group: 0,
        }
    }
}

// ============================================================================
// UndoManager
// ============================================================================

/// Undo/redo engine over local and global histories.
pub struct UndoManager {
    config: UndoConfig,
    stacks: HistoryStacks,
    merger: CommandMerger,
    links: ResourceLinks,
    confirmer: Box<dyn Confirmer>,
    observers: Vec<Box<dyn UndoObserver>>,
    next_group: u64,
}

impl fmt::Debug for UndoManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoManager")
            .field("config", &self.config)
            .field("stacks", &self.stacks)
            .field("merger", &self.merger)
            .field("links", &self.links.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl UndoManager {
    /// Create a manager with the given limits, no observers and a confirmer
    /// that always proceeds.
    #[must_use]
    pub fn new(config: UndoConfig) -> Self {
        Self::builder().config(config).build()
    }

    #[must_use]
    pub fn builder() -> UndoManagerBuilder {
        UndoManagerBuilder::default()
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &UndoConfig {
        &self.config
    }

    /// Read access to the history stacks.
    #[must_use]
    pub fn stacks(&self) -> &HistoryStacks {
        &self.stacks
    }

    /// Look up a live group.
    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&CommandGroup> {
        self.stacks.group(id)
    }

    /// Number of live groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.stacks.group_count()
    }

    fn allocate_id(&mut self) -> GroupId {
        self.next_group += 1;
        GroupId::new(self.next_group)
    }

    fn key_for(&self, target: &Target) -> StackKey {
        match target {
            Target::Global => StackKey::Global,
            Target::Resource(resource) => StackKey::Local(self.links.resolve(resource)),
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Open a command boundary.
    ///
    /// Actions buffered by an enclosing transparent scope are flushed first
    /// so they do not end up inside the command.
    ///
    /// # Panics
    ///
    /// Panics if a command is already open.
    pub fn begin_command(&mut self, spec: CommandSpec) {
        if let Some(open) = self.merger.open_spec() {
            panic!(
                "command already started: begin_command('{}') while '{}' is open",
                spec.name, open.name
            );
        }
        let buffered = self.merger.take_transparent();
        if !buffered.is_empty() {
            self.flush_transparent(buffered);
        }
        debug!(
            target: "rewind::merge",
            name = %spec.name,
            merge_id = ?spec.merge_id,
            client = %spec.client,
            "command started"
        );
        self.merger.begin(spec);
    }

    /// Record an action into the open command or transparent scope.
    ///
    /// # Panics
    ///
    /// Panics if neither is open.
    pub fn record(&mut self, action: Box<dyn UndoableAction>) {
        self.merger.record(action);
    }

    /// Flag the open command as global.
    ///
    /// # Panics
    ///
    /// Panics if no command is open.
    pub fn mark_global(&mut self) {
        self.merger.mark_global();
    }

    /// Whether a command boundary is open.
    #[must_use]
    pub fn is_command_open(&self) -> bool {
        self.merger.is_command_open()
    }

    /// Close the open command.
    ///
    /// Returns the group the command was recorded into, or `None` when the
    /// command recorded no actions.
    ///
    /// # Panics
    ///
    /// Panics if no command is open.
    pub fn end_command(&mut self) -> Option<GroupId> {
        let pending = self.merger.end();
        if pending.actions.is_empty() {
            trace!(target: "rewind::merge", name = %pending.spec.name, "empty command discarded");
            return None;
        }

        let spec = pending.spec;
        let id = match self.merger.decide(&spec, &self.stacks) {
            MergeTarget::Append(id) => {
                if let Some(group) = self.stacks.group_mut(id) {
                    group.merge_spec(&spec);
                }
                self.append_actions(id, pending.actions, true);
                self.stacks.clear_redo_for(id);
                id
            }
            MergeTarget::Absorb(id) => {
                if let Some(group) = self.stacks.group_mut(id) {
                    group.absorb_into_command(&spec);
                }
                self.append_actions(id, pending.actions, true);
                self.stacks.clear_redo_for(id);
                id
            }
            MergeTarget::New => {
                let id = self.allocate_id();
                let mut group = CommandGroup::new(id, GroupKind::Command, spec);
                for action in pending.actions {
                    let resources = canonical_resources(&self.links, action.affected());
                    group.append(action, resources);
                }
                self.stacks.push(group);
                id
            }
        };
        self.merger.note_group(id);

        if let Some(group) = self.stacks.group(id) {
            debug!(
                target: "rewind::merge",
                group = %id,
                name = %group.name(),
                actions = group.len(),
                undo_depth = self.stacks.depth(&StackKey::Global, Direction::Undo),
                "command recorded"
            );
            let summary = GroupSummary::from(group);
            for observer in &mut self.observers {
                observer.command_recorded(&summary);
            }
        }
        Some(id)
    }

    /// Run `body` inside a command boundary.
    pub fn execute_command<R>(&mut self, spec: CommandSpec, body: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_command(spec);
        let result = body(self);
        self.end_command();
        result
    }

    /// Stop the next command from merging into the last group.
    pub fn break_merge(&mut self) {
        trace!(target: "rewind::merge", "merge broken");
        self.merger.break_merge();
    }

    fn append_actions(&mut self, id: GroupId, actions: Vec<Box<dyn UndoableAction>>, clear_redo: bool) {
        let links = &self.links;
        let Some(group) = self.stacks.group_mut(id) else {
            warn!(target: "rewind::merge", group = %id, dropped = actions.len(), "group vanished before append");
            return;
        };
        let mut added = Vec::new();
        for action in actions {
            let resources = canonical_resources(links, action.affected());
            added.extend(group.append(action, resources));
        }
        if !added.is_empty() {
            self.stacks.attach(id, &added, clear_redo);
        }
    }

    // ========================================================================
    // Transparent scopes
    // ========================================================================

    /// Open a transparent scope. Scopes nest.
    pub fn begin_transparent(&mut self) {
        self.merger.begin_transparent();
    }

    /// Close a transparent scope, attaching its actions once the outermost
    /// scope closes.
    ///
    /// # Panics
    ///
    /// Panics if no transparent scope is open.
    pub fn end_transparent(&mut self) {
        if let Some(actions) = self.merger.end_transparent() {
            self.flush_transparent(actions);
        }
    }

    /// Run `body` inside a transparent scope.
    pub fn run_transparently<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_transparent();
        let result = body(self);
        self.end_transparent();
        result
    }

    fn flush_transparent(&mut self, actions: Vec<Box<dyn UndoableAction>>) {
        if let Some(id) = self.merger.attach_target(&self.stacks) {
            debug!(target: "rewind::merge", group = %id, actions = actions.len(), "transparent actions attached");
            self.append_actions(id, actions, false);
            return;
        }

        let id = self.allocate_id();
        let mut group = CommandGroup::new(id, GroupKind::Transparent, CommandSpec::default());
        for action in actions {
            let resources = canonical_resources(&self.links, action.affected());
            group.append(action, resources);
        }
        debug!(target: "rewind::merge", group = %id, actions = group.len(), "transparent group recorded");
        self.stacks.push(group);
    }

    // ========================================================================
    // Compounds
    // ========================================================================

    /// Start a compound: every command closed until
    /// [`finish_compound`](Self::finish_compound) folds into one group.
    ///
    /// # Panics
    ///
    /// Panics if a compound is already open.
    pub fn start_compound(&mut self, name: impl Into<String>) {
        let name = name.into();
        debug!(target: "rewind::merge", name = %name, "compound started");
        self.merger.start_compound(name);
    }

    /// Finish the compound, naming its group after it.
    ///
    /// # Panics
    ///
    /// Panics if no compound is open.
    pub fn finish_compound(&mut self) -> Option<GroupId> {
        let (name, group) = self.merger.finish_compound();
        let id = group?;
        let group = self.stacks.group_mut(id)?;
        group.rename(name);
        debug!(target: "rewind::merge", group = %id, name = %group.name(), "compound finished");
        Some(id)
    }

    // ========================================================================
    // Undo / redo
    // ========================================================================

    /// Undo the next step of `target`.
    ///
    /// # Panics
    ///
    /// Panics if a command is open.
    pub fn undo(&mut self, target: impl Into<Target>) -> Result<UndoOutcome, UndoError> {
        self.replay(Direction::Undo, &target.into(), None)
    }

    /// Redo the next step of `target`.
    ///
    /// # Panics
    ///
    /// Panics if a command is open.
    pub fn redo(&mut self, target: impl Into<Target>) -> Result<UndoOutcome, UndoError> {
        self.replay(Direction::Redo, &target.into(), None)
    }

    /// Undo on behalf of `client`; refused unless `client` recorded the
    /// step's command.
    pub fn undo_as(
        &mut self,
        target: impl Into<Target>,
        client: ClientId,
    ) -> Result<UndoOutcome, UndoError> {
        self.replay(Direction::Undo, &target.into(), Some(client))
    }

    /// Redo on behalf of `client`.
    pub fn redo_as(
        &mut self,
        target: impl Into<Target>,
        client: ClientId,
    ) -> Result<UndoOutcome, UndoError> {
        self.replay(Direction::Redo, &target.into(), Some(client))
    }

    fn replay(
        &mut self,
        direction: Direction,
        target: &Target,
        client: Option<ClientId>,
    ) -> Result<UndoOutcome, UndoError> {
        if let Some(open) = self.merger.open_spec() {
            panic!("cannot {direction} while command '{}' is open", open.name);
        }

        let key = self.key_for(target);
        let span = debug_span!(target: "rewind::undo", "replay", %direction, stack = %key);
        let _guard = span.enter();

        let Some(step) = self.stacks.step(&key, direction) else {
            debug!(target: "rewind::undo", "nothing to {direction}");
            return Ok(UndoOutcome::Unavailable);
        };
        let Some(principal) = self.stacks.group(step.principal) else {
            return Ok(UndoOutcome::Unavailable);
        };
        let name = principal.name().to_string();

        if let Some(client) = client
            && principal.client() != client
        {
            debug!(
                target: "rewind::undo",
                group = %step.principal,
                owner = %principal.client(),
                %client,
                "step belongs to another client"
            );
            return Err(UndoError::Conflict {
                kind: ConflictKind::ForeignChange,
                direction,
                resources: principal.affected().to_vec(),
            });
        }
        if principal.kind() == GroupKind::Barrier {
            debug!(target: "rewind::undo", group = %step.principal, "blocked by external change");
            return Err(UndoError::Conflict {
                kind: ConflictKind::ExternallyChanged,
                direction,
                resources: principal.affected().to_vec(),
            });
        }

        let diverged = self.stacks.diverged(&step, direction);
        if !diverged.is_empty() {
            debug!(target: "rewind::undo", group = %step.principal, diverged = diverged.len(), "local history diverged");
            return Err(UndoError::Conflict {
                kind: ConflictKind::AlreadyChanged,
                direction,
                resources: diverged,
            });
        }

        let groups: Vec<&CommandGroup> = step
            .ids
            .iter()
            .filter_map(|id| self.stacks.group(*id))
            .collect();
        if ConfirmationResolver::resolve(groups.iter().copied()) == Confirmation::Ask {
            let message = confirmation_message(direction, &name, &groups);
            if self.confirmer.confirm(&message) == Decision::Abort {
                debug!(target: "rewind::undo", group = %step.principal, "declined");
                return Ok(UndoOutcome::Declined);
            }
        }

        for (index, &id) in step.ids.iter().enumerate() {
            let result = match self.stacks.group_mut(id) {
                Some(group) => match direction {
                    Direction::Undo => group.undo(),
                    Direction::Redo => group.redo(),
                },
                None => Ok(()),
            };
            if let Err(source) = result {
                warn!(target: "rewind::undo", group = %id, error = %source, "replay failed, rolling back");
                for &done in step.ids[..index].iter().rev() {
                    if let Some(group) = self.stacks.group_mut(done) {
                        let restored = match direction {
                            Direction::Undo => group.redo(),
                            Direction::Redo => group.undo(),
                        };
                        if let Err(err) = restored {
                            warn!(target: "rewind::undo", group = %done, error = %err, "rollback failed");
                        }
                    }
                }
                return Err(UndoError::Action { group: id, source });
            }
        }

        self.stacks.move_step(&step, direction);
        self.merger.reset_after_replay();

        let summaries: Vec<GroupSummary> = step
            .ids
            .iter()
            .filter_map(|id| self.stacks.group(*id))
            .map(GroupSummary::from)
            .collect();
        for observer in &mut self.observers {
            match direction {
                Direction::Undo => observer.undone(&summaries),
                Direction::Redo => observer.redone(&summaries),
            }
        }
        debug!(target: "rewind::undo", group = %step.principal, name = %name, groups = step.ids.len(), "step replayed");
        Ok(UndoOutcome::Applied { name })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether `target` has a step to undo.
    #[must_use]
    pub fn is_undo_available(&self, target: impl Into<Target>) -> bool {
        self.stacks.is_available(&self.key_for(&target.into()), Direction::Undo)
    }

    /// Whether `target` has a step to redo.
    #[must_use]
    pub fn is_redo_available(&self, target: impl Into<Target>) -> bool {
        self.stacks.is_available(&self.key_for(&target.into()), Direction::Redo)
    }

    /// Number of groups on the undo side of `target`.
    #[must_use]
    pub fn undo_depth(&self, target: impl Into<Target>) -> usize {
        self.stacks.depth(&self.key_for(&target.into()), Direction::Undo)
    }

    /// Number of groups on the redo side of `target`.
    #[must_use]
    pub fn redo_depth(&self, target: impl Into<Target>) -> usize {
        self.stacks.depth(&self.key_for(&target.into()), Direction::Redo)
    }

    /// Name of the command the next undo on `target` would revert.
    #[must_use]
    pub fn next_undo_name(&self, target: impl Into<Target>) -> Option<&str> {
        self.next_name(&target.into(), Direction::Undo)
    }

    /// Name of the command the next redo on `target` would re-apply.
    #[must_use]
    pub fn next_redo_name(&self, target: impl Into<Target>) -> Option<&str> {
        self.next_name(&target.into(), Direction::Redo)
    }

    fn next_name(&self, target: &Target, direction: Direction) -> Option<&str> {
        let step = self.stacks.step(&self.key_for(target), direction)?;
        self.stacks.group(step.principal).map(CommandGroup::name)
    }

    /// Drop every history. Links and local stacks survive.
    pub fn clear(&mut self) {
        debug!(target: "rewind::lifecycle", groups = self.stacks.group_count(), "history cleared");
        self.stacks.clear();
        self.merger.break_merge();
    }

    // ========================================================================
    // Links
    // ========================================================================

    /// Make `copy` share the local history of `original`.
    pub fn link_resources(&mut self, copy: ResourceRef, original: ResourceRef) -> Result<(), UndoError> {
        self.links.link(copy.clone(), original.clone())?;
        debug!(target: "rewind::lifecycle", %copy, %original, "resources linked");
        Ok(())
    }

    /// Detach `copy` from its original, returning the original.
    pub fn unlink_resource(&mut self, copy: &ResourceRef) -> Option<ResourceRef> {
        self.links.unlink(copy)
    }

    /// The resource whose local history `resource` addresses.
    #[must_use]
    pub fn resolve_resource(&self, resource: &ResourceRef) -> ResourceRef {
        self.links.resolve(resource)
    }

    // ========================================================================
    // Lifecycle hooks
    // ========================================================================

    /// Register a new resource and create its empty local stack.
    pub fn on_resource_created(&mut self, resource: &ResourceRef) {
        let canonical = self.links.resolve(resource);
        self.stacks.ensure_local(&canonical);
        debug!(target: "rewind::lifecycle", resource = %canonical, "resource created");
    }

    /// Forget a disposed resource.
    ///
    /// Its local stack and every link mentioning it are removed, and every
    /// non-global group touching it is purged. Disposing a copy leaves its
    /// original's history alone. Copies of a disposed resource survive it:
    /// they are relinked to its own original, or, when it was a root, the
    /// oldest copy takes over its local history and the others link to it.
    pub fn on_resource_disposed(&mut self, resource: &ResourceRef) {
        let was_copy = self.links.is_copy(resource);
        let copies = self.links.copies_of(resource);
        if !copies.is_empty() {
            self.hand_over(resource, copies);
        }
        let links = self.links.forget(resource);
        let purged = self.stacks.invalidate(resource, false);
        debug!(
            target: "rewind::lifecycle",
            %resource,
            was_copy,
            links,
            purged = purged.len(),
            "resource disposed"
        );
        self.after_invalidation(resource, &purged);
    }

    /// React to a change of `resource` made outside the engine.
    ///
    /// With `force_record` a barrier is recorded that undo cannot pass;
    /// otherwise the resource's history is invalidated and its stack kept.
    pub fn on_resource_externally_changed(&mut self, resource: &ResourceRef, force_record: bool) {
        let canonical = self.links.resolve(resource);
        if force_record {
            let id = self.allocate_id();
            self.stacks.push(CommandGroup::barrier(id, canonical.clone()));
            debug!(target: "rewind::lifecycle", resource = %canonical, group = %id, "external change recorded");
            self.merger.break_merge();
        } else {
            let purged = self.stacks.invalidate(&canonical, true);
            debug!(
                target: "rewind::lifecycle",
                resource = %canonical,
                purged = purged.len(),
                "external change invalidated history"
            );
            self.after_invalidation(&canonical, &purged);
        }
    }

    fn hand_over(&mut self, resource: &ResourceRef, copies: Vec<ResourceRef>) {
        let mut copies = copies.into_iter();
        let heir = match self.links.original_of(resource).cloned() {
            Some(original) => original,
            None => {
                let Some(heir) = copies.next() else {
                    return;
                };
                self.links.unlink(&heir);
                self.stacks.rekey(resource, &heir);
                heir
            }
        };
        for copy in copies {
            if let Err(err) = self.links.link(copy.clone(), heir.clone()) {
                warn!(target: "rewind::lifecycle", %copy, error = %err, "copy could not be relinked");
            }
        }
        debug!(target: "rewind::lifecycle", %resource, %heir, "copies handed over");
    }

    fn after_invalidation(&mut self, resource: &ResourceRef, purged: &[GroupSummary]) {
        self.merger.break_merge();
        for observer in &mut self.observers {
            observer.history_invalidated(resource, purged);
        }
    }
}

fn canonical_resources(links: &ResourceLinks, resources: &[ResourceRef]) -> Vec<ResourceRef> {
    let mut canonical: Vec<ResourceRef> = Vec::with_capacity(resources.len());
    for resource in resources {
        let root = links.resolve(resource);
        if !canonical.contains(&root) {
            canonical.push(root);
        }
    }
    canonical
}

fn confirmation_message(direction: Direction, name: &str, groups: &[&CommandGroup]) -> String {
    let verb = match direction {
        Direction::Undo => "Undo",
        Direction::Redo => "Redo",
    };
    let mut labels: Vec<&str> = Vec::new();
    for group in groups {
        for resource in group.affected() {
            if !labels.contains(&resource.label()) {
                labels.push(resource.label());
            }
        }
    }
    if labels.is_empty() {
        format!("{verb} '{name}'?")
    } else {
        format!("{verb} '{name}' affecting {}?", labels.join(", "))
    }
}
