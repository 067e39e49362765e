//! Parsing of terminal input lines into viewer commands.

use crate::status::{Endpoint, UnknownEndpoint};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/tab <chat|goal|map>`
    SelectTab(Endpoint),
    /// `/user <name>`
    SetUsername(String),
    /// `/focus <robot>`
    Focus(String),
    /// `/quit`
    Quit,
    /// Free text for the chat session.
    Say(String),
    /// Blank line.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("unknown command `/{0}` (try /tab, /user, /focus, /quit)")]
    UnknownCommand(String),
    #[error("/{0} needs an argument")]
    MissingArgument(&'static str),
    #[error(transparent)]
    Endpoint(#[from] UnknownEndpoint),
}

/// Parse one line of input.
pub fn parse_command(line: &str) -> Result<Command, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Say(line.to_owned()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "tab" => Ok(Command::SelectTab(require("tab", arg)?.parse()?)),
        "user" => Ok(Command::SetUsername(require("user", arg)?.to_owned())),
        "focus" => Ok(Command::Focus(require("focus", arg)?.to_owned())),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(InputError::UnknownCommand(other.to_owned())),
    }
}

fn require<'a>(name: &'static str, arg: &'a str) -> Result<&'a str, InputError> {
    if arg.is_empty() { Err(InputError::MissingArgument(name)) } else { Ok(arg) }
}

#[cfg(test)]
#[path = "input_test.rs"]
mod tests;
