// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Interactive yes/no questions.

use std::io::{self, BufRead, IsTerminal, Write};

#[cfg(test)]
#[path = "./confirm_test.rs"]
mod confirm_test;

/// Asks the user to confirm something.
pub trait Confirm: Send + Sync {
    fn confirm(&self, message: &str, default: bool) -> crate::Result<bool>;
}

/// Asks on stderr and reads the answer from stdin.
///
/// Without a terminal to ask on, the default answer is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, message: &str, default: bool) -> crate::Result<bool> {
        if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
            tracing::debug!("non-interactive, answering {default} to: {message}");
            return Ok(default);
        }

        let hint = if default { "[Y/n]" } else { "[y/N]" };
        write!(io::stderr(), "{message} {hint} ")?;
        io::stderr().flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        Ok(parse_answer(&input, default))
    }
}

/// Interpret a typed answer, where an empty answer means `default`.
pub fn parse_answer(input: &str, default: bool) -> bool {
    match input.trim().to_ascii_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    }
}
