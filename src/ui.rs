//! Interaction shim
//!
//! The reconciler talks to the operator exclusively through the
//! [`Interaction`] trait, so the same engine runs interactively on a
//! terminal, headless under `--yes`, or against a scripted responder in
//! tests.

use std::collections::VecDeque;

use console::style;
use dialoguer::{Confirm, Select};

use crate::error::{Error, Result};

/// Operator answer to a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// Apply to everything without further prompting
    All,
    /// Skip everything
    None,
    /// Show the affected items, then ask again
    List,
}

/// Severity of a reported line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
}

/// Injected operator I/O capability
pub trait Interaction {
    /// Yes/no question (master confirmation, per-table drops)
    fn confirm(&mut self, prompt: &str) -> Result<Answer>;

    /// Orphan-table disposition: yes (one by one) / all / none / list
    fn choose_disposition(&mut self, prompt: &str) -> Result<Answer>;

    /// Sectioned progress output
    fn report(&mut self, section: &str, message: &str, level: Level);
}

/// Interactive console implementation
#[derive(Debug, Default)]
pub struct ConsoleUi {
    current_section: Option<String>,
}

impl ConsoleUi {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Interaction for ConsoleUi {
    fn confirm(&mut self, prompt: &str) -> Result<Answer> {
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|_| Error::Cancelled)?;
        Ok(if confirmed { Answer::Yes } else { Answer::No })
    }

    fn choose_disposition(&mut self, prompt: &str) -> Result<Answer> {
        let selection = Select::new()
            .with_prompt(prompt)
            .items(&["yes (decide per table)", "all", "none", "list"])
            .default(2)
            .interact()
            .map_err(|_| Error::Cancelled)?;
        Ok(match selection {
            0 => Answer::Yes,
            1 => Answer::All,
            3 => Answer::List,
            _ => Answer::None,
        })
    }

    fn report(&mut self, section: &str, message: &str, level: Level) {
        if self.current_section.as_deref() != Some(section) {
            println!();
            println!("  {}", style(section).cyan().bold().underlined());
            self.current_section = Some(section.to_string());
        }
        match level {
            Level::Info => println!("  {} {}", style("→").cyan(), message),
            Level::Success => println!("  {} {}", style("✓").green().bold(), style(message).dim()),
            Level::Warn => println!("  {} {}", style("!").yellow().bold(), style(message).yellow()),
            Level::Error => eprintln!("  {} {}", style("✖").red().bold(), style(message).red()),
        }
    }
}

/// Non-interactive implementation with deterministic answers: every
/// confirmation is yes, and the orphan-table disposition is `all` when
/// `assume_yes` is set and `none` otherwise.
#[derive(Debug, Default)]
pub struct HeadlessUi {
    pub assume_yes: bool,
}

impl HeadlessUi {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Interaction for HeadlessUi {
    fn confirm(&mut self, _prompt: &str) -> Result<Answer> {
        Ok(Answer::Yes)
    }

    fn choose_disposition(&mut self, _prompt: &str) -> Result<Answer> {
        Ok(if self.assume_yes {
            Answer::All
        } else {
            Answer::None
        })
    }

    fn report(&mut self, section: &str, message: &str, level: Level) {
        match level {
            Level::Error => tracing::error!(section, "{message}"),
            Level::Warn => tracing::warn!(section, "{message}"),
            _ => tracing::info!(section, "{message}"),
        }
    }
}

/// Scripted responder: answers are consumed in order, output is captured.
/// Exhausted confirmations answer no and exhausted dispositions answer
/// none.
#[derive(Debug, Default)]
pub struct ScriptedUi {
    answers: VecDeque<Answer>,
    pub transcript: Vec<String>,
}

impl ScriptedUi {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            transcript: Vec::new(),
        }
    }
}

impl Interaction for ScriptedUi {
    fn confirm(&mut self, prompt: &str) -> Result<Answer> {
        self.transcript.push(format!("confirm: {prompt}"));
        Ok(self.answers.pop_front().unwrap_or(Answer::No))
    }

    fn choose_disposition(&mut self, prompt: &str) -> Result<Answer> {
        self.transcript.push(format!("choose: {prompt}"));
        Ok(self.answers.pop_front().unwrap_or(Answer::None))
    }

    fn report(&mut self, section: &str, message: &str, _level: Level) {
        self.transcript.push(format!("{section}: {message}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_headless_defaults() {
        let mut cautious = HeadlessUi::new(false);
        assert_eq!(cautious.confirm("Ready to proceed?").unwrap(), Answer::Yes);
        assert_eq!(
            cautious.choose_disposition("Drop orphans?").unwrap(),
            Answer::None
        );

        let mut assume_yes = HeadlessUi::new(true);
        assert_eq!(
            assume_yes.choose_disposition("Drop orphans?").unwrap(),
            Answer::All
        );
    }

    #[test]
    fn test_scripted_answers_in_order() {
        let mut ui = ScriptedUi::new([Answer::Yes, Answer::List, Answer::All]);
        assert_eq!(ui.confirm("proceed?").unwrap(), Answer::Yes);
        assert_eq!(ui.choose_disposition("orphans?").unwrap(), Answer::List);
        assert_eq!(ui.choose_disposition("orphans?").unwrap(), Answer::All);
        // exhausted
        assert_eq!(ui.confirm("again?").unwrap(), Answer::No);
        assert_eq!(ui.choose_disposition("again?").unwrap(), Answer::None);
    }

    #[test]
    fn test_scripted_transcript_captures_reports() {
        let mut ui = ScriptedUi::default();
        ui.report("Update indexes", "3 indexes added, 1 removed", Level::Success);
        assert_eq!(
            ui.transcript,
            vec!["Update indexes: 3 indexes added, 1 removed"]
        );
    }
}
