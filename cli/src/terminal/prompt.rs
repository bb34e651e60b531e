use anyhow::Context;
use colored::*;
use console::Term;

use crate::terminal::colors;

const MAX_ATTEMPTS: usize = 3;

/// Asks the operator how many devices the run should use.
pub fn ask_device_count() -> anyhow::Result<usize> {
    let term: Term = Term::stdout();

    for _ in 0..MAX_ATTEMPTS {
        let question: ColoredString = "How many devices? ".color(colors::PRIMARY).bold();
        term.write_str(&question.to_string())?;
        let answer: String = term.read_line().context("failed to read device count")?;

        match parse_count(&answer) {
            Some(count) => return Ok(count),
            None => term.write_line(&format!(
                "{}",
                format!("'{}' is not a positive number", answer.trim()).yellow()
            ))?,
        }
    }

    anyhow::bail!("no valid device count given after {MAX_ATTEMPTS} attempts")
}

fn parse_count(answer: &str) -> Option<usize> {
    answer.trim().parse::<usize>().ok().filter(|n| *n > 0)
}
