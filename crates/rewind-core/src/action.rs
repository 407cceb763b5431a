#![forbid(unsafe_code)]

//! Reversible actions.
//!
//! An [`UndoableAction`] is a single edit that has already been applied by
//! its producer. The engine only ever asks it to revert (`undo`) or to
//! re-apply (`redo`) itself, and asks which resources it touches.
//!
//! # Invariants
//!
//! - `undo()` followed by `redo()` restores the observable state exactly
//! - `redo()` followed by `undo()` restores the observable state exactly
//! - `affected()` is stable for the lifetime of the action

use std::fmt;

use thiserror::Error;

use crate::resource::ResourceRef;

/// An action could not be replayed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionError {
    message: String,
}

impl ActionError {
    /// Create an error with a human-readable message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result of replaying an action.
pub type ActionResult = Result<(), ActionError>;

/// A reversible edit.
pub trait UndoableAction: Send + Sync {
    /// Revert the edit.
    fn undo(&mut self) -> ActionResult;

    /// Re-apply the edit after it was reverted.
    fn redo(&mut self) -> ActionResult;

    /// Resources the edit touches.
    fn affected(&self) -> &[ResourceRef];

    /// Whether the edit makes its command global (file creation, renames,
    /// refactorings spanning the project).
    fn is_global(&self) -> bool {
        false
    }

    /// Debug description of the action.
    fn debug_name(&self) -> &'static str {
        "UndoableAction"
    }
}

impl fmt::Debug for dyn UndoableAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.debug_name())
            .field("affected", &self.affected())
            .field("global", &self.is_global())
            .finish()
    }
}

/// Callback type used by [`FnAction`].
pub type ActionFn = Box<dyn FnMut() -> ActionResult + Send + Sync>;

/// An action assembled from a pair of callbacks.
pub struct FnAction {
    resources: Vec<ResourceRef>,
    undo: ActionFn,
    redo: ActionFn,
    global: bool,
}

impl fmt::Debug for FnAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction")
            .field("resources", &self.resources)
            .field("global", &self.global)
            .finish()
    }
}

impl FnAction {
    /// Create an action touching `resources`.
    pub fn new<U, R>(resources: Vec<ResourceRef>, undo: U, redo: R) -> Self
    where
        U: FnMut() -> ActionResult + Send + Sync + 'static,
        R: FnMut() -> ActionResult + Send + Sync + 'static,
    {
        Self {
            resources,
            undo: Box::new(undo),
            redo: Box::new(redo),
            global: false,
        }
    }

    /// Mark the action as global.
    #[must_use]
    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }
}

impl UndoableAction for FnAction {
    fn undo(&mut self) -> ActionResult {
        (self.undo)()
    }

    fn redo(&mut self) -> ActionResult {
        (self.redo)()
    }

    fn affected(&self) -> &[ResourceRef] {
        &self.resources
    }

    fn is_global(&self) -> bool {
        self.global
    }

    fn debug_name(&self) -> &'static str {
        "FnAction"
    }
}
