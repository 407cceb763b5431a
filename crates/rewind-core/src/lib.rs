#![forbid(unsafe_code)]

//! Undo/redo command engine.
//!
//! `rewind-core` keeps one bounded history per resource ("local") plus one
//! bounded global history, folds the fine-grained actions issued inside a
//! command boundary into a single undoable [`CommandGroup`], and replays
//! those groups backwards and forwards on request.
//!
//! # Architecture
//!
//! ```text
//! begin_command ─► record(action)* ─► end_command
//!                        │                 │
//!                        ▼                 ▼
//!                 ┌──────────────┐   ┌──────────────────────────────┐
//!                 │ CommandMerger│──►│ HistoryStacks                 │
//!                 │ (pending,    │   │  global: [g1, g2, g3 | g4]    │
//!                 │  transparent,│   │  a.txt:  [g1, g3]             │
//!                 │  compound)   │   │  b.txt:  [g2, g3 | g4]        │
//!                 └──────────────┘   └──────────────────────────────┘
//!                                          │ undo/redo step
//!                                          ▼
//!                           ConfirmationResolver ─► Confirmer
//! ```
//!
//! A group that touches several resources is stored once and referenced
//! from the global stack and from the local stack of each resource it
//! touches. It is dropped when no stack references it any more.
//!
//! # Quick Start
//!
//! ```ignore
//! use rewind_core::{CommandSpec, ResourceRef, Target, UndoManager, UndoConfig};
//!
//! let doc = ResourceRef::new("notes.txt");
//! let mut undo = UndoManager::new(UndoConfig::default());
//!
//! undo.execute_command(CommandSpec::new("Typing"), |undo| {
//!     undo.record(Box::new(insert_action(&doc, "hello")));
//! });
//!
//! assert!(undo.is_undo_available(Target::Resource(doc.clone())));
//! undo.undo(Target::Resource(doc))?;
//! ```
//!
//! # Module Structure
//!
//! - [`resource`]: resource identities and copy/original links
//! - [`action`]: the [`UndoableAction`] trait
//! - [`group`]: command groups, policies and client ids
//! - [`merger`]: command boundaries, transparent scopes, compound marks
//! - [`stacks`]: bounded local and global history stacks
//! - [`confirm`]: confirmation policy resolution
//! - [`observer`]: synchronous history observers
//! - [`manager`]: the [`UndoManager`] facade

pub mod action;
pub mod config;
pub mod confirm;
pub mod error;
pub mod group;
pub mod manager;
pub mod merger;
pub mod observer;
pub mod resource;
pub mod stacks;

pub use action::{ActionError, ActionResult, FnAction, UndoableAction};
pub use config::{ConfigError, UndoConfig};
pub use confirm::{AlwaysProceed, Confirmation, ConfirmationResolver, Confirmer, Decision};
pub use error::{ConflictKind, UndoError, UndoOutcome};
pub use group::{ClientId, CommandGroup, CommandSpec, ConfirmationPolicy, GroupId, GroupKind};
pub use manager::{Target, UndoManager, UndoManagerBuilder};
pub use observer::{GroupSummary, UndoObserver};
pub use resource::{ResourceLinks, ResourceRef};
pub use stacks::{Direction, StackKey};
