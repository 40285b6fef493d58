//! The interactive read-eval-print loop.

use crate::completer::ShellHelper;
use crate::error::ShellResult;
use crate::interpreter::Interpreter;
use crate::io_adapters::Streams;
use crate::prompt;
use crate::style::{GREEN, RESET, YELLOW};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Editor};
use std::io;

pub const WELCOME: &str =
    "Welcome to Enhanced Custom Shell! Type 'help' to see available commands. Type 'exit' to quit.";
pub const GOODBYE: &str = "Exiting Custom Shell. Goodbye!";

/// Prompt, read and interpret lines until `exit` or end of input.
///
/// Ctrl-C abandons the current line and prompts again. Only a line editor
/// failure ends the loop with an error.
pub fn run(shell: &mut Interpreter) -> ShellResult<()> {
    let config = Config::builder()
        .completion_type(CompletionType::List)
        .history_ignore_space(true)
        .build();
    if let Err(e) = ignore_interrupts() {
        tracing::warn!(error = %e, "can't install Ctrl-C handler");
    }
    let mut rl: Editor<ShellHelper, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(ShellHelper::default()));

    loop {
        sync_process_dir(shell);
        if let Some(helper) = rl.helper_mut() {
            helper.sync(shell);
        }
        for entry in shell.history_mut().take_unsynced() {
            let _ = rl.add_history_entry(entry.as_str());
        }

        match rl.readline(&prompt::render(shell.env())) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let stdin = io::stdin();
                let mut input = stdin.lock();
                let mut out = io::stdout();
                let mut err = io::stderr();
                let mut streams = Streams::new(&mut input, &mut out, &mut err);
                let status = shell.process_command(line, &mut streams);
                tracing::debug!(status, "command finished");
                if shell.should_exit() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("\n{YELLOW}Interrupted. Type 'exit' to quit.{RESET}");
            }
            Err(ReadlineError::Eof) => {
                println!("\n{GREEN}{GOODBYE}{RESET}");
                break;
            }
            Err(err) => {
                tracing::error!(error = %err, "line editor failed");
                return Err(err.into());
            }
        }
    }
    Ok(())
}

/// Keep Ctrl-C from killing the shell while a foreground command runs.
///
/// The signal still reaches the children, which start with the default
/// disposition. At the prompt the line editor reads Ctrl-C as a key instead.
fn ignore_interrupts() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| tracing::debug!("interrupt received"))
}

/// Keep the process working directory in step with the interpreter's, so
/// relative paths typed at the prompt and completion agree with `cd`.
fn sync_process_dir(shell: &Interpreter) {
    let wanted = &shell.env().current_dir;
    if std::env::current_dir().ok().as_ref() == Some(wanted) {
        return;
    }
    if let Err(e) = std::env::set_current_dir(wanted) {
        tracing::warn!(dir = %wanted.display(), error = %e, "can't change process directory");
    }
}
