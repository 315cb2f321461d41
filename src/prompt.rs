//! Interactive yes/no confirmation

use std::io::{BufRead, IsTerminal};

use inquire::{InquireError, Text};
use log::debug;

use crate::error::{PackageError, PackageResult};

/// Asks the user to confirm an operation
pub trait Prompt {
    /// `Ok(true)` only for an affirmative answer; anything else is a cancellation
    fn confirm(&self, question: &str) -> PackageResult<bool>;
}

/// Terminal prompt; falls back to a plain stdin line when stdin is not a TTY
#[derive(Debug, Default, Clone, Copy)]
pub struct InteractivePrompt;

impl Prompt for InteractivePrompt {
    fn confirm(&self, question: &str) -> PackageResult<bool> {
        let question = format!("{question} (Y/N):");

        if !std::io::stdin().is_terminal() {
            return read_piped_answer(&question);
        }

        match Text::new(&question).prompt() {
            Ok(answer) => Ok(is_affirmative(&answer)),
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                debug!("Prompt dismissed, treating as cancellation");
                Ok(false)
            }
            Err(InquireError::NotTTY) => read_piped_answer(&question),
            Err(e) => Err(PackageError::Prompt(e.to_string())),
        }
    }
}

fn read_piped_answer(question: &str) -> PackageResult<bool> {
    eprint!("{question} ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| PackageError::Prompt(e.to_string()))?;
    Ok(is_affirmative(&line))
}

/// Only a trimmed, case-insensitive `y` counts as yes
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}
