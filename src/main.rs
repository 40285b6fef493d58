use anyhow::{Context, Result};
use custom_shell::command::ExitCode;
use custom_shell::config::Options;
use custom_shell::repl;
use custom_shell::style::{self, GREEN, RESET};
use custom_shell::{Interpreter, Streams};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Send diagnostics to a file so they never interleave with the prompt.
/// Verbosity comes from `RUST_LOG` and defaults to errors only.
fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("can't open log file {}", path.display()))?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")))
        .init();
    Ok(())
}

fn run(options: &Options, shell: &mut Interpreter) -> Result<ExitCode> {
    let interactive = options.command.is_none() && options.script.is_none();
    if interactive {
        println!("{GREEN}{}{RESET}", repl::WELCOME);
    }

    {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut out = io::stdout();
        let mut err = io::stderr();
        let mut streams = Streams::new(&mut input, &mut out, &mut err);

        if let Some(rc) = options.rc_path() {
            if let Err(e) = shell.load_rc(&rc, &mut streams) {
                style::report(&mut *streams.err, "startup", &e);
            }
        }
        if let Some(command) = &options.command {
            return Ok(shell.process_command(command, &mut streams));
        }
        if let Some(script) = &options.script {
            return Ok(shell.source_file(script, &mut streams)?);
        }
    }

    if !shell.should_exit() {
        repl::run(shell)?;
    }
    Ok(0)
}

fn main() {
    let options: Options = argh::from_env();
    if let Err(e) = init_logging(&options.log_path()) {
        eprintln!("custom_shell: {e:#}");
    }
    tracing::debug!(?options, "starting");

    let mut shell = Interpreter::default();
    let status = match run(&options, &mut shell) {
        Ok(code) => code,
        Err(e) => {
            style::report(&mut io::stderr(), "custom_shell", format!("{e:#}"));
            1
        }
    };
    std::process::exit(status);
}
