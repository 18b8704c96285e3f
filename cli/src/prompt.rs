//! Operator interaction.
//!
//! Steps that are destructive or security-relevant ask for confirmation and
//! credential collection reads text and secrets, all through [`Prompter`] so
//! non-interactive runs and tests never block on a terminal.
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::PromptError;

/// Source of operator answers.
#[cfg_attr(test, mockall::automock)]
pub trait Prompter: Send + Sync + std::fmt::Debug {
    /// Ask a yes/no question.
    ///
    /// # Errors
    ///
    /// Returns a [`PromptError`] if no answer can be obtained.
    fn confirm(&self, question: &str) -> Result<bool, PromptError>;

    /// Read one line of visible text.
    ///
    /// # Errors
    ///
    /// Returns a [`PromptError`] if no answer can be obtained.
    fn read_text(&self, prompt: &str) -> Result<String, PromptError>;

    /// Read one secret without echoing it.
    ///
    /// # Errors
    ///
    /// Returns a [`PromptError`] if no answer can be obtained.
    fn read_secret(&self, prompt: &str) -> Result<String, PromptError>;
}

/// Interactive prompter on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

fn from_inquire(err: inquire::InquireError) -> PromptError {
    match err {
        inquire::InquireError::OperationCanceled | inquire::InquireError::OperationInterrupted => {
            PromptError::Cancelled
        }
        other => PromptError::Terminal(other.to_string()),
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&self, question: &str) -> Result<bool, PromptError> {
        inquire::Confirm::new(question)
            .with_default(false)
            .prompt()
            .map_err(from_inquire)
    }

    fn read_text(&self, prompt: &str) -> Result<String, PromptError> {
        inquire::Text::new(prompt).prompt().map_err(from_inquire)
    }

    fn read_secret(&self, prompt: &str) -> Result<String, PromptError> {
        inquire::Password::new(prompt)
            .without_confirmation()
            .with_display_mode(inquire::PasswordDisplayMode::Hidden)
            .prompt()
            .map_err(from_inquire)
    }
}

/// Prompter for unattended runs: every confirmation is answered "yes" and
/// there is nobody to type text or secrets.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractivePrompter;

impl Prompter for NonInteractivePrompter {
    fn confirm(&self, _question: &str) -> Result<bool, PromptError> {
        Ok(true)
    }

    fn read_text(&self, prompt: &str) -> Result<String, PromptError> {
        Err(PromptError::Exhausted(prompt.to_string()))
    }

    fn read_secret(&self, prompt: &str) -> Result<String, PromptError> {
        Err(PromptError::Exhausted(prompt.to_string()))
    }
}

/// Prompter that replays queued answers and records every question asked.
///
/// Used by tests and by automation that wants to script a session.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    confirms: Mutex<VecDeque<bool>>,
    texts: Mutex<VecDeque<String>>,
    secrets: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// An empty script; every prompt fails with [`PromptError::Exhausted`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a confirmation answer.
    #[must_use]
    pub fn confirm_with(self, answer: bool) -> Self {
        if let Ok(mut q) = self.confirms.lock() {
            q.push_back(answer);
        }
        self
    }

    /// Queue a text answer.
    #[must_use]
    pub fn text(self, answer: &str) -> Self {
        if let Ok(mut q) = self.texts.lock() {
            q.push_back(answer.to_string());
        }
        self
    }

    /// Queue a secret answer.
    #[must_use]
    pub fn secret(self, answer: &str) -> Self {
        if let Ok(mut q) = self.secrets.lock() {
            q.push_back(answer.to_string());
        }
        self
    }

    /// Every prompt shown so far, in order.
    #[must_use]
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map_or_else(|_| Vec::new(), |a| a.clone())
    }

    /// Number of prompts shown so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.asked.lock().map_or(0, |a| a.len())
    }

    fn next<T>(&self, queue: &Mutex<VecDeque<T>>, prompt: &str) -> Result<T, PromptError> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(prompt.to_string());
        }
        queue
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .ok_or_else(|| PromptError::Exhausted(prompt.to_string()))
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, question: &str) -> Result<bool, PromptError> {
        self.next(&self.confirms, question)
    }

    fn read_text(&self, prompt: &str) -> Result<String, PromptError> {
        self.next(&self.texts, prompt)
    }

    fn read_secret(&self, prompt: &str) -> Result<String, PromptError> {
        self.next(&self.secrets, prompt)
    }
}
