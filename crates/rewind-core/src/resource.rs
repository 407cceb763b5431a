#![forbid(unsafe_code)]

//! Resource identities.
//!
//! A [`ResourceRef`] names a document or file that actions affect. The
//! engine never owns the resource; it only compares and hashes the handle.
//! Identity is allocated at construction, so a file that is deleted and
//! recreated under the same name gets a fresh identity and does not inherit
//! the old history unless the two are linked through [`ResourceLinks`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::UndoError;

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, comparable handle to a document or file.
#[derive(Clone)]
pub struct ResourceRef {
    id: u64,
    label: Arc<str>,
}

impl ResourceRef {
    /// Allocate a new resource identity.
    ///
    /// The label is only used for diagnostics; two calls with the same label
    /// produce two distinct resources.
    #[must_use]
    pub fn new(label: impl Into<Arc<str>>) -> Self {
        Self {
            id: NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed),
            label: label.into(),
        }
    }

    /// Raw identity value.
    #[must_use]
    pub const fn raw(&self) -> u64 {
        self.id
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl PartialEq for ResourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ResourceRef {}

impl Hash for ResourceRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceRef({}, {:?})", self.id, self.label)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Directed `copy -> original` edges between resources.
///
/// Edits and queries addressed to a copy are redirected to the root of its
/// chain. Edges are lookups by identity; nothing here keeps a resource alive.
#[derive(Debug, Default, Clone)]
pub struct ResourceLinks {
    edges: HashMap<ResourceRef, ResourceRef>,
}

impl ResourceLinks {
    /// Create an empty link table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Link `copy` to `original`, replacing any previous link of `copy`.
    ///
    /// Fails when the link would point a resource at itself or close a cycle.
    pub fn link(&mut self, copy: ResourceRef, original: ResourceRef) -> Result<(), UndoError> {
        if copy == original {
            return Err(UndoError::InvalidLink {
                copy,
                original,
                reason: "a resource cannot be linked to itself",
            });
        }
        if self.reaches(&original, &copy) {
            return Err(UndoError::InvalidLink {
                copy,
                original,
                reason: "the link would form a cycle",
            });
        }
        self.edges.insert(copy, original);
        Ok(())
    }

    /// Remove the link of `copy`, returning its former original.
    pub fn unlink(&mut self, copy: &ResourceRef) -> Option<ResourceRef> {
        self.edges.remove(copy)
    }

    /// Whether `resource` is linked to some original.
    #[must_use]
    pub fn is_copy(&self, resource: &ResourceRef) -> bool {
        self.edges.contains_key(resource)
    }

    /// Follow the chain of links from `resource` to its root.
    #[must_use]
    pub fn resolve(&self, resource: &ResourceRef) -> ResourceRef {
        let mut seen = HashSet::new();
        let mut current = resource;
        while seen.insert(current.raw()) {
            match self.edges.get(current) {
                Some(next) => current = next,
                None => break,
            }
        }
        current.clone()
    }

    /// Whether the chain from `from` passes through `target`, ignoring the
    /// current edge of `target` since `link` replaces it.
    fn reaches(&self, from: &ResourceRef, target: &ResourceRef) -> bool {
        let mut seen = HashSet::new();
        let mut current = from;
        while seen.insert(current.raw()) {
            if current == target {
                return true;
            }
            match self.edges.get(current) {
                Some(next) => current = next,
                None => break,
            }
        }
        false
    }

    /// Resources linked directly to `original`, in creation order.
    #[must_use]
    pub fn copies_of(&self, original: &ResourceRef) -> Vec<ResourceRef> {
        let mut copies: Vec<ResourceRef> = self
            .edges
            .iter()
            .filter(|(_, to)| *to == original)
            .map(|(copy, _)| copy.clone())
            .collect();
        copies.sort_by_key(ResourceRef::raw);
        copies
    }

    /// The original `copy` is linked to directly.
    #[must_use]
    pub fn original_of(&self, copy: &ResourceRef) -> Option<&ResourceRef> {
        self.edges.get(copy)
    }

    /// Drop every edge that starts or ends at `resource`.
    ///
    /// Returns the number of edges removed.
    pub fn forget(&mut self, resource: &ResourceRef) -> usize {
        let before = self.edges.len();
        self.edges
            .retain(|copy, original| copy != resource && original != resource);
        before - self.edges.len()
    }

    /// Number of links.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the table has no links.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
