//! # Prompts
//!
//! Yes/no confirmations before cluster mutations.

use crate::error::Result;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Asks the operator a yes/no question
pub trait Prompter: Send {
    fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// Reads answers from stdin; only `y`/`yes` (any case) confirm
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        let mut stdout = io::stdout();
        write!(stdout, "{question} [y/N]: ")?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(is_yes(&answer))
    }
}

/// Gives the same answer to every question; `--skip-prompts` uses `true`
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompter(pub bool);

impl Prompter for FixedPrompter {
    fn confirm(&mut self, _question: &str) -> Result<bool> {
        Ok(self.0)
    }
}

/// Replays a list of answers and records every question asked
///
/// Once the answers run out every further question is declined.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<bool>,
    pub questions: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            questions: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        self.questions.push(question.to_string());
        Ok(self.answers.pop_front().unwrap_or(false))
    }
}

/// Choose the prompter for a command
#[must_use]
pub fn prompter(skip_prompts: bool) -> Box<dyn Prompter> {
    if skip_prompts {
        Box::new(FixedPrompter(true))
    } else {
        Box::new(StdinPrompter)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
