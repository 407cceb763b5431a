#![forbid(unsafe_code)]

//! Scripted confirmation.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use rewind_core::{Confirmer, Decision};

/// Confirmer that answers from a queue and records every question.
///
/// Clones share the script and the log, so a test can keep one handle and
/// give the other to the manager.
#[derive(Debug, Clone)]
pub struct ScriptedConfirmer {
    fallback: Decision,
    answers: Arc<Mutex<VecDeque<Decision>>>,
    asked: Arc<Mutex<Vec<String>>>,
}

impl Default for ScriptedConfirmer {
    fn default() -> Self {
        Self::new(Decision::Proceed)
    }
}

impl ScriptedConfirmer {
    /// Answer `fallback` once the script runs out.
    #[must_use]
    pub fn new(fallback: Decision) -> Self {
        Self {
            fallback,
            answers: Arc::default(),
            asked: Arc::default(),
        }
    }

    /// Queue the next answer.
    pub fn answer(&self, decision: Decision) -> &Self {
        self.answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(decision);
        self
    }

    /// Every message asked so far.
    #[must_use]
    pub fn asked(&self) -> Vec<String> {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&mut self, message: &str) -> Decision {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
        self.answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(self.fallback)
    }
}
