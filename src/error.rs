//! Error taxonomy shared by the interpretation engine.

use crate::command::ExitCode;
use thiserror::Error;

/// Result alias used by the lexer, substitution engine, pipeline executor and job table.
pub type ShellResult<T> = Result<T, ShellError>;

/// Errors surfaced while interpreting a command line.
///
/// None of these terminate the interactive loop; the dispatcher reports them
/// and moves on to the next prompt.
#[derive(Error, Debug)]
pub enum ShellError {
    /// Malformed quoting or escaping. The line is discarded.
    #[error("parse error: {0}")]
    Parse(String),

    /// A path, file, alias or other named resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Filesystem or process failure.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// A command substitution failed; its span was replaced by an empty string.
    #[error("Error in command substitution: {0}")]
    Substitution(String),

    /// The executable of a pipeline stage could not be located.
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    /// `fg` was given an id that is not in the job table.
    #[error("No such job: {0}")]
    NoSuchJob(u64),

    #[error("{0}")]
    InvalidArgument(String),

    /// The line editor failed in a way the loop cannot recover from.
    #[error("readline: {0}")]
    Readline(String),
}

impl ShellError {
    /// Status reported to the user when this error ends a command.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ShellError::CommandNotFound(_) => 127,
            ShellError::Parse(_) => 2,
            _ => 1,
        }
    }
}

impl From<rustyline::error::ReadlineError> for ShellError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        ShellError::Readline(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_shell_conventions() {
        assert_eq!(ShellError::CommandNotFound("nope".into()).exit_code(), 127);
        assert_eq!(ShellError::Parse("unterminated quote".into()).exit_code(), 2);
        assert_eq!(ShellError::NoSuchJob(4).exit_code(), 1);
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(ShellError::from(io).exit_code(), 1);
    }

    #[test]
    fn messages_name_the_missing_thing() {
        assert_eq!(
            ShellError::CommandNotFound("frobnicate".into()).to_string(),
            "Command not found: frobnicate"
        );
        assert_eq!(ShellError::NoSuchJob(7).to_string(), "No such job: 7");
    }
}
