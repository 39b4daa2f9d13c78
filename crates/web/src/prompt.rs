//! Interactive prompts the screens need (technician id, delete confirmation).
//!
//! Screens never talk to a terminal or a browser dialog directly; they go
//! through a `Prompter`. Over HTTP the answers arrive with the submitted form,
//! so `FormPrompter` is pre-answered and records what would have been shown.

use std::sync::Mutex;

pub const TECH_ID_PROMPT: &str = "Enter your Tech ID:";
pub const DELETE_CONFIRMATION: &str =
    "Are you sure you want to permanently delete this tire type?";

pub trait Prompter: Send + Sync {
    /// Ask for free text; `None` means cancelled.
    fn prompt(&self, message: &str) -> Option<String>;

    /// Ask a yes/no question.
    fn confirm(&self, message: &str) -> bool;

    /// Show a message to the user.
    fn notify(&self, message: &str);
}

/// Prompter answered up front from request input.
#[derive(Debug, Default)]
pub struct FormPrompter {
    answer: Option<String>,
    confirmed: bool,
    notices: Mutex<Vec<String>>,
}

impl FormPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(mut self, answer: Option<String>) -> Self {
        self.answer = answer;
        self
    }

    pub fn with_confirmation(mut self, confirmed: bool) -> Self {
        self.confirmed = confirmed;
        self
    }

    /// Messages passed to `notify`, oldest first.
    pub fn notices(&self) -> Vec<String> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl Prompter for FormPrompter {
    fn prompt(&self, message: &str) -> Option<String> {
        tracing::debug!(prompt = message, answered = self.answer.is_some(), "prompt");
        self.answer.clone()
    }

    fn confirm(&self, message: &str) -> bool {
        tracing::debug!(prompt = message, confirmed = self.confirmed, "confirm");
        self.confirmed
    }

    fn notify(&self, message: &str) {
        match self.notices.lock() {
            Ok(mut n) => n.push(message.to_string()),
            Err(poisoned) => poisoned.into_inner().push(message.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_prompter_replays_answers_and_records_notices() {
        let p = FormPrompter::new()
            .with_answer(Some("2719".to_string()))
            .with_confirmation(true);
        assert_eq!(p.prompt(TECH_ID_PROMPT).as_deref(), Some("2719"));
        assert!(p.confirm(DELETE_CONFIRMATION));

        p.notify("first");
        p.notify("second");
        assert_eq!(p.notices(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn default_form_prompter_cancels_and_declines() {
        let p = FormPrompter::new();
        assert_eq!(p.prompt(TECH_ID_PROMPT), None);
        assert!(!p.confirm(DELETE_CONFIRMATION));
        assert!(p.notices().is_empty());
    }
}
