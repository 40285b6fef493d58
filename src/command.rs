use crate::interpreter::Interpreter;
use crate::io_adapters::Streams;
use anyhow::Result;

/// Status of a finished command: 0 is success, 127 a missing program,
/// 128+N a program killed by signal N.
pub type ExitCode = i32;

/// Object-safe trait for a command the shell runs in-process.
///
/// Built-ins get this through a blanket impl; argument errors get a small
/// stand-in that prints the usage text.
pub trait ExecutableCommand {
    /// Executes the command against the interpreter state.
    fn execute(self: Box<Self>, shell: &mut Interpreter, streams: &mut Streams<'_>)
    -> Result<ExitCode>;
}

/// Builds a command when handed its own name; yields `None` for any other name.
pub trait CommandFactory {
    /// Name this factory answers to; used for help listings and completion.
    fn name(&self) -> &'static str;

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}
