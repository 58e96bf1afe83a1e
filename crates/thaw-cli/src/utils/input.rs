//! User input utilities for interactive command-line prompts.
//!
//! Each prompt re-asks until it gets a usable answer. The parsing is kept in
//! small pure functions so it can be tested without a terminal.

use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use thaw_core::format_bytes;

use crate::commands::parse_size;

/// Prompts the user for a string input.
///
/// The input is read from stdin and returned with whitespace trimmed.
///
/// # Errors
///
/// Returns an error if reading from stdin fails or stdin is closed.
pub fn prompt_string(prompt: &str) -> Result<String> {
    print!("{prompt} ");
    io::stdout().flush().context("Failed to flush prompt")?;

    let mut input = String::new();
    let read = io::stdin()
        .read_line(&mut input)
        .context("Failed to read user input")?;
    if read == 0 {
        bail!("stdin closed while waiting for an answer");
    }
    Ok(input.trim().to_string())
}

/// Interpret a yes/no answer. Empty input selects `default`.
pub fn parse_yes_no(input: &str, default: bool) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        "" => Some(default),
        _ => None,
    }
}

/// Prompts the user for a yes/no answer; the capitalised letter is the default.
pub fn prompt_yes_no(prompt: &str, default: bool) -> Result<bool> {
    let choices = if default { "[Y/n]" } else { "[y/N]" };
    loop {
        let input = prompt_string(&format!("{prompt} {choices}"))?;
        if let Some(answer) = parse_yes_no(&input, default) {
            return Ok(answer);
        }
        eprintln!("Please enter 'y' for yes or 'n' for no.");
    }
}

/// Blocks until the user presses Enter.
pub fn wait_for_enter() -> Result<()> {
    prompt_string("Press Enter to continue...").map(|_| ())
}

/// Prompts for a download speed such as `10K`, `256K` or `1M`.
pub fn prompt_bytes_per_second() -> Result<u64> {
    loop {
        let input = prompt_string("Download speed per second (e.g. 10K, 256K, 1M, 10M):")?;
        match parse_size(&input) {
            Ok(speed) => {
                println!("Download speed used: {}/s", format_bytes(speed));
                return Ok(speed);
            }
            Err(e) => eprintln!("{e}"),
        }
    }
}

/// Interpret a 1-based menu choice among `count` options.
pub fn parse_selection(input: &str, count: usize) -> Option<usize> {
    input
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=count).contains(n))
        .map(|n| n - 1)
}

/// Prompts the user to pick one of `options`; returns its index.
pub fn prompt_selection(prompt: &str, options: &[String]) -> Result<usize> {
    println!("{prompt}");
    for (i, option) in options.iter().enumerate() {
        println!("  {}) {option}", i + 1);
    }
    loop {
        let input = prompt_string(&format!("Choice [1-{}]:", options.len()))?;
        if let Some(index) = parse_selection(&input, options.len()) {
            return Ok(index);
        }
        eprintln!("Please enter a number between 1 and {}.", options.len());
    }
}
