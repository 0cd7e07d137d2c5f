//! Special commands parser for the interactive session
//!
//! Commands are prefixed with `/` and the command word is case-insensitive.
//! Arguments keep their original case so file paths survive intact. Any
//! other input replaces the current prompt.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during the interactive session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Run the analysis on the current prompt and image
    Analyze,

    /// Select an image, or clear the selection with `None`
    SelectImage(Option<PathBuf>),

    /// Show the current prompt
    ShowPrompt,

    /// List history summaries
    ListHistory,

    /// Redisplay a history entry without contacting the backend
    ShowEntry(usize),

    /// Display the status line, model and selection
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input replaces the current prompt.
    None,
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns CommandError::UnknownCommand if input starts with "/" but is not a valid command.
/// Returns CommandError::UnsupportedArgument if a command receives an invalid argument.
/// Returns CommandError::MissingArgument if a command requires an argument but none was provided.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use visionchat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// let cmd = parse_special_command("/image ./Photos/Cat.PNG").unwrap();
/// assert_eq!(cmd, SpecialCommand::SelectImage(Some(PathBuf::from("./Photos/Cat.PNG"))));
///
/// let cmd = parse_special_command("/show 2").unwrap();
/// assert_eq!(cmd, SpecialCommand::ShowEntry(2));
///
/// let cmd = parse_special_command("what breed is this dog?").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let (word, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((word, arg)) => (word.to_lowercase(), arg.trim()),
        None => (lower.clone(), ""),
    };

    match word.as_str() {
        "/analyze" | "/run" => no_argument("/analyze", arg, SpecialCommand::Analyze),

        "/image" => {
            if arg.is_empty() {
                Ok(SpecialCommand::SelectImage(None))
            } else {
                Ok(SpecialCommand::SelectImage(Some(PathBuf::from(arg))))
            }
        }

        "/prompt" => no_argument("/prompt", arg, SpecialCommand::ShowPrompt),
        "/history" => no_argument("/history", arg, SpecialCommand::ListHistory),

        "/show" => {
            if arg.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "/show".to_string(),
                    usage: "/show <index>".to_string(),
                });
            }
            arg.parse::<usize>()
                .map(SpecialCommand::ShowEntry)
                .map_err(|_| CommandError::UnsupportedArgument {
                    command: "/show".to_string(),
                    arg: arg.to_string(),
                })
        }

        "/status" => no_argument("/status", arg, SpecialCommand::ShowStatus),
        "/help" | "/?" => Ok(SpecialCommand::Help),

        "exit" | "quit" | "/exit" | "/quit" => Ok(SpecialCommand::Exit),

        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

fn no_argument(
    command: &str,
    arg: &str,
    parsed: SpecialCommand,
) -> Result<SpecialCommand, CommandError> {
    if arg.is_empty() {
        Ok(parsed)
    } else {
        Err(CommandError::UnsupportedArgument {
            command: command.to_string(),
            arg: arg.to_string(),
        })
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for the Interactive Session
============================================

ANALYSIS:
  /analyze        - Analyze the selected image with the current prompt
  /run            - Same as /analyze
  <any text>      - Replace the current prompt
  /prompt         - Show the current prompt

IMAGE SELECTION:
  /image <path>   - Select an image (png, jpg, jpeg, bmp, gif)
  /image          - Clear the selection

HISTORY:
  /history        - List previous analyses
  /show <index>   - Show a previous analysis again

SESSION:
  /status         - Show status, model and selected image
  /help           - Show this help message
  exit            - Exit the session
"#
    );
}
