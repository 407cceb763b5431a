#![forbid(unsafe_code)]

//! Confirmation of undo/redo steps.
//!
//! The [`ConfirmationResolver`] folds the policies of the groups in a step
//! into one [`Confirmation`]. It performs no I/O. When the answer is
//! [`Confirmation::Ask`], the manager hands a message to the injected
//! [`Confirmer`], whose [`Decision`] either lets the step proceed or aborts
//! it without touching any history.

use crate::group::{CommandGroup, ConfirmationPolicy};

/// Whether a step needs the user's consent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Silent,
    Ask,
}

/// Answer of a [`Confirmer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Abort,
}

/// Resolves confirmation policies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmationResolver;

impl ConfirmationResolver {
    /// Effective confirmation of a single group.
    ///
    /// `Default` asks when the group is global or spans more than one
    /// resource.
    #[must_use]
    pub fn effective(group: &CommandGroup) -> Confirmation {
        match group.policy() {
            ConfirmationPolicy::Ask => Confirmation::Ask,
            ConfirmationPolicy::Silent => Confirmation::Silent,
            ConfirmationPolicy::Default => {
                if group.is_global() || group.affected().len() > 1 {
                    Confirmation::Ask
                } else {
                    Confirmation::Silent
                }
            }
        }
    }

    /// Combined confirmation of several groups; `Ask` wins.
    #[must_use]
    pub fn resolve<'a>(groups: impl IntoIterator<Item = &'a CommandGroup>) -> Confirmation {
        if groups
            .into_iter()
            .any(|group| Self::effective(group) == Confirmation::Ask)
        {
            Confirmation::Ask
        } else {
            Confirmation::Silent
        }
    }
}

/// Turns a confirmation request into a decision. Injected by the UI layer.
pub trait Confirmer: Send + Sync {
    fn confirm(&mut self, message: &str) -> Decision;
}

/// Confirmer that always proceeds, for headless hosts and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysProceed;

impl Confirmer for AlwaysProceed {
    fn confirm(&mut self, _message: &str) -> Decision {
        Decision::Proceed
    }
}

impl<F> Confirmer for F
where
    F: FnMut(&str) -> Decision + Send + Sync,
{
    fn confirm(&mut self, message: &str) -> Decision {
        self(message)
    }
}
