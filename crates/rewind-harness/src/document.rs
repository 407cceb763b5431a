#![forbid(unsafe_code)]

//! In-memory text documents with reversible edits.
//!
//! A [`TextDocument`] applies an edit immediately and hands back the
//! [`TextEdit`] describing it, ready to be recorded into an open command.
//! Undo and redo check that the document still holds the text they expect
//! at the edit's offset and fail with an [`ActionError`] otherwise, which
//! makes stale replays visible in tests.

use std::fmt;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rewind_core::{ActionError, ActionResult, CommandSpec, ResourceRef, UndoManager, UndoableAction};

/// A shared, mutable text buffer identified by a [`ResourceRef`].
#[derive(Clone)]
pub struct TextDocument {
    resource: ResourceRef,
    text: Arc<Mutex<String>>,
}

impl fmt::Debug for TextDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextDocument")
            .field("resource", &self.resource)
            .field("text", &self.text())
            .finish()
    }
}

impl TextDocument {
    /// Create an empty document.
    pub fn new(label: &str) -> Self {
        Self::with_text(label, "")
    }

    /// Create a document holding `text`.
    pub fn with_text(label: &str, text: &str) -> Self {
        Self {
            resource: ResourceRef::new(label),
            text: Arc::new(Mutex::new(text.to_string())),
        }
    }

    /// A second view of the same buffer under a new resource identity.
    ///
    /// Link the copy to the original to make both share one local history.
    #[must_use]
    pub fn copy_view(&self, label: &str) -> Self {
        Self {
            resource: ResourceRef::new(label),
            text: self.text.clone(),
        }
    }

    /// Resource identity of the document.
    #[must_use]
    pub fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    /// Current text.
    #[must_use]
    pub fn text(&self) -> String {
        self.lock().clone()
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        self.text.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `s` at byte `offset`.
    pub fn insert(&self, offset: usize, s: &str) -> Result<TextEdit, ActionError> {
        self.replace(offset..offset, s)
    }

    /// Append `s` at the end.
    pub fn append(&self, s: &str) -> TextEdit {
        let mut text = self.lock();
        let offset = text.len();
        text.push_str(s);
        TextEdit {
            resource: self.resource.clone(),
            text: self.text.clone(),
            offset,
            removed: String::new(),
            inserted: s.to_string(),
        }
    }

    /// Delete the bytes in `range`.
    pub fn delete(&self, range: Range<usize>) -> Result<TextEdit, ActionError> {
        self.replace(range, "")
    }

    /// Replace the bytes in `range` with `s`.
    pub fn replace(&self, range: Range<usize>, s: &str) -> Result<TextEdit, ActionError> {
        let mut text = self.lock();
        let Some(removed) = text.get(range.clone()).map(str::to_string) else {
            return Err(ActionError::new(format!(
                "range {range:?} is outside of {} or splits a character",
                self.resource
            )));
        };
        text.replace_range(range.clone(), s);
        Ok(TextEdit {
            resource: self.resource.clone(),
            text: self.text.clone(),
            offset: range.start,
            removed,
            inserted: s.to_string(),
        })
    }

    /// Overwrite the text without producing an action, as an external tool
    /// would.
    pub fn overwrite_externally(&self, s: &str) {
        *self.lock() = s.to_string();
    }

    /// Append `s` inside its own command and return the group it landed in.
    pub fn type_in(&self, undo: &mut UndoManager, spec: CommandSpec, s: &str) -> Option<rewind_core::GroupId> {
        undo.begin_command(spec);
        undo.record(Box::new(self.append(s)));
        undo.end_command()
    }

    /// Append `s` inside a transparent scope.
    pub fn type_transparently(&self, undo: &mut UndoManager, s: &str) {
        let edit = self.append(s);
        undo.run_transparently(|undo| undo.record(Box::new(edit)));
    }
}

/// One replacement of `removed` by `inserted` at `offset`.
pub struct TextEdit {
    resource: ResourceRef,
    text: Arc<Mutex<String>>,
    offset: usize,
    removed: String,
    inserted: String,
}

impl fmt::Debug for TextEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextEdit")
            .field("resource", &self.resource)
            .field("offset", &self.offset)
            .field("removed", &self.removed)
            .field("inserted", &self.inserted)
            .finish()
    }
}

impl TextEdit {
    fn swap(&self, expected: &str, replacement: &str) -> ActionResult {
        let mut text = self.text.lock().unwrap_or_else(PoisonError::into_inner);
        let range = self.offset..self.offset + expected.len();
        if text.get(range.clone()) != Some(expected) {
            return Err(ActionError::new(format!(
                "{} no longer holds {expected:?} at {}",
                self.resource, self.offset
            )));
        }
        text.replace_range(range, replacement);
        Ok(())
    }
}

impl UndoableAction for TextEdit {
    fn undo(&mut self) -> ActionResult {
        self.swap(&self.inserted, &self.removed)
    }

    fn redo(&mut self) -> ActionResult {
        self.swap(&self.removed, &self.inserted)
    }

    fn affected(&self) -> &[ResourceRef] {
        std::slice::from_ref(&self.resource)
    }

    fn debug_name(&self) -> &'static str {
        "TextEdit"
    }
}
