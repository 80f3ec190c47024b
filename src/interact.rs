//! Interactive decision points
//!
//! The pipeline never talks to a terminal directly; it asks through
//! [`UserInteraction`] so tests can inject scripted answers. The terminal
//! implementation uses dialoguer, matching the rest of the CLI.

use crate::error::{Error, Result};
use dialoguer::{Confirm, Select};

/// Interactive prompts consumed by the landing pipeline
pub trait UserInteraction {
    /// Ask a yes/no question. `default` is offered as the Enter answer.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;

    /// Ask the user to pick one of `options`. Returns the selected index.
    ///
    /// Implementations must return an error (not a default) when no valid
    /// selection is made; the caller treats that as an abort.
    fn choose(&self, prompt: &str, options: &[&str]) -> Result<usize>;
}

/// Terminal prompter backed by dialoguer
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

impl UserInteraction for TerminalPrompter {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(|e| Error::Interact(format!("failed to read confirmation: {e}")))
    }

    fn choose(&self, prompt: &str, options: &[&str]) -> Result<usize> {
        Select::new()
            .with_prompt(prompt)
            .items(options)
            .interact()
            .map_err(|e| Error::Interact(format!("failed to read selection: {e}")))
    }
}
