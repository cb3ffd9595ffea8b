//! Line-oriented operator console.
//!
//! Presentation layer of the daemon: filters are added and removed while
//! readings keep flowing, and the current states can be listed by device.
//!
//! ```text
//! > add Ia > 5
//! Added #1: Ia > 5
//! > list
//! Device1
//!   #1  Ia > 5   matched    (last transition 1700000000000000 us)
//! > remove 1
//! Removed #1
//! ```

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::types::{Device, FilterId};
use crate::engine::FilterEngine;
use crate::error::Error;

/// Usage of the rule grammar, shown when a rule is rejected.
pub const RULE_USAGE: &str = "Invalid rule format.\n\
    Use: I[letter] [operator] [number]\n\
    Where: [letter] is a lower case letter,\n\
    [operator] is <, > or = and\n\
    [number] is a positive integer.\n\
    Example: Ia > 5";

const HELP: &str = "Commands:\n  \
    add <rule>     add a filter, e.g. `add Ia > 5`\n  \
    remove <id>    remove a filter by id\n  \
    list           show filters and their states by device\n  \
    stats          show ingest statistics\n  \
    help           show this help\n  \
    quit           stop the monitor";

/// Parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(String),
    Remove(FilterId),
    List,
    Stats,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "add" | "a" if !rest.is_empty() => Command::Add(rest.to_string()),
            "add" | "a" => return Err("usage: add <rule>".to_string()),
            "remove" | "rm" | "r" => rest
                .parse()
                .map(Command::Remove)
                .map_err(|_| format!("usage: remove <id>, got '{}'", rest))?,
            "list" | "ls" | "l" => Command::List,
            "stats" | "s" => Command::Stats,
            "help" | "h" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("unknown command '{}', try `help`", other)),
        };

        Ok(Some(command))
    }
}

/// Execute a command, writing its output. Returns false on `quit`.
pub fn execute<W: Write>(engine: &FilterEngine, command: &Command, out: &mut W) -> io::Result<bool> {
    match command {
        Command::Add(text) => match engine.add_filter_str(text) {
            Ok(id) => {
                let rule = engine.filter_rule(id).map(|r| r.to_string());
                writeln!(out, "Added {}: {}", id, rule.unwrap_or_else(|_| text.clone()))?;
            }
            Err(Error::InvalidRule(reason)) => {
                writeln!(out, "{}\n({})", RULE_USAGE, reason)?;
            }
            Err(e) => writeln!(out, "Error: {}", e)?,
        },
        Command::Remove(id) => match engine.remove_filter(*id) {
            Ok(()) => writeln!(out, "Removed {}", id)?,
            Err(e) => writeln!(out, "{}", e)?,
        },
        Command::List => write_states(engine, out)?,
        Command::Stats => writeln!(out, "{}", engine.stats())?,
        Command::Help => writeln!(out, "{}", HELP)?,
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

/// Filters grouped by device.
pub fn write_states<W: Write>(engine: &FilterEngine, out: &mut W) -> io::Result<()> {
    let views = engine.list_filter_states();
    if views.is_empty() {
        return writeln!(out, "No filters");
    }

    for device in Device::ALL {
        let mut rows = views.iter().filter(|v| v.device() == device).peekable();
        if rows.peek().is_none() {
            continue;
        }
        writeln!(out, "{}", device)?;
        for view in rows {
            let state = if view.is_matched() { "matched" } else { "unmatched" };
            let (id, rule) = (view.id().to_string(), view.rule.to_string());
            match view.last_transition_us {
                Some(ts) => writeln!(
                    out,
                    "  {:<4}{:<9}{:<11}(last transition {} us)",
                    id, rule, state, ts
                )?,
                None => writeln!(out, "  {:<4}{:<9}{}", id, rule, state)?,
            }
        }
    }
    Ok(())
}

/// Run the console until `quit`, end of input, or `running` is cleared.
///
/// Only `quit` clears `running`; a closed stdin leaves the daemon up.
pub fn run<R: BufRead, W: Write>(
    engine: &FilterEngine,
    input: R,
    out: &mut W,
    running: &AtomicBool,
) -> io::Result<()> {
    for line in input.lines() {
        if !running.load(Ordering::Relaxed) {
            return Ok(());
        }

        let command = match Command::parse(&line?) {
            Ok(Some(c)) => c,
            Ok(None) => continue,
            Err(message) => {
                writeln!(out, "{}", message)?;
                continue;
            }
        };

        if !execute(engine, &command, out)? {
            running.store(false, Ordering::SeqCst);
            break;
        }
        out.flush()?;
    }

    Ok(())
}
