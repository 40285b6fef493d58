//! An interactive command-line shell.
//!
//! Each input line is expanded (command substitution), tokenized with shell
//! quoting rules, checked for a `NAME=value` assignment, resolved against the
//! alias table, and finally run as a built-in or as a pipeline of external
//! processes, optionally in the background.
//!
//! The main entry point is [`Interpreter`]. Everything it prints goes through
//! [`Streams`], so the whole engine can be driven from tests with in-memory
//! buffers. The interactive loop in [`repl`] wires it to a terminal.

pub mod alias;
mod builtin;
pub mod command;
pub mod config;
mod completer;
pub mod env;
pub mod error;
mod external;
pub mod help;
pub mod history;
mod interpreter;
pub mod io_adapters;
pub mod jobs;
pub mod lexer;
pub mod pipeline;
mod prompt;
pub mod repl;
pub mod style;
pub mod substitution;

/// Just a convenient re-export of the interpretation engine.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
pub use io_adapters::Streams;
