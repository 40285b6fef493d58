//! Building and running `a | b | c` as a chain of OS processes.

use crate::command::ExitCode;
use crate::env::Environment;
use crate::error::{ShellError, ShellResult};
use crate::external::{exit_code, find_command_path};
use crate::lexer;
use crate::style;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

/// One process in a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub program: String,
    pub args: Vec<String>,
}

/// Stages in execution order; stage *i* reads what stage *i-1* writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Split `line` on unquoted `|` and tokenize every segment on its own.
    pub fn parse(line: &str) -> ShellResult<Self> {
        let stages = lexer::split_pipeline(line)
            .into_iter()
            .map(|segment| {
                let mut tokens = lexer::tokenize(segment)?.into_iter();
                let program = tokens
                    .next()
                    .ok_or_else(|| ShellError::Parse("empty command in pipeline".into()))?;
                Ok(Stage {
                    program,
                    args: tokens.collect(),
                })
            })
            .collect::<ShellResult<Vec<_>>>()?;
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

/// What the last stage left behind.
#[derive(Debug, Default)]
pub struct PipelineOutput {
    pub status: ExitCode,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Spawn every stage, wire them together and wait for all of them.
///
/// Executables are looked up before anything starts, so a missing program
/// never leaves half a pipeline blocked on a pipe. Background pipelines read
/// from `/dev/null` instead of the terminal.
pub fn execute(pipeline: &Pipeline, env: &Environment, background: bool) -> ShellResult<PipelineOutput> {
    let search_paths = env.get_var("PATH").unwrap_or_default();
    let programs = pipeline
        .stages
        .iter()
        .map(|stage| {
            find_command_path(OsStr::new(&search_paths), Path::new(&stage.program), &env.current_dir)
                .map(Cow::into_owned)
                .ok_or_else(|| ShellError::CommandNotFound(stage.program.clone()))
        })
        .collect::<ShellResult<Vec<PathBuf>>>()?;

    let last = programs.len().saturating_sub(1);
    let mut children: Vec<Child> = Vec::with_capacity(programs.len());
    let mut upstream: Option<ChildStdout> = None;

    for (i, (stage, program)) in pipeline.stages.iter().zip(&programs).enumerate() {
        let stdin = match upstream.take() {
            Some(previous) => Stdio::from(previous),
            None if background => Stdio::null(),
            None => Stdio::inherit(),
        };
        let stderr = if i == last { Stdio::piped() } else { Stdio::inherit() };

        tracing::debug!(stage = i, program = %program.display(), args = ?stage.args, "spawning");
        let spawned = Command::new(program)
            .args(&stage.args)
            .envs(env.vars.iter())
            .current_dir(&env.current_dir)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(stderr)
            .spawn();

        match spawned {
            Ok(mut child) => {
                if i != last {
                    upstream = child.stdout.take();
                }
                children.push(child);
            }
            Err(err) => {
                abort(children);
                return Err(match err.kind() {
                    ErrorKind::NotFound => ShellError::CommandNotFound(stage.program.clone()),
                    _ => err.into(),
                });
            }
        }
    }

    let Some(tail) = children.pop() else {
        return Ok(PipelineOutput::default());
    };
    let output = tail.wait_with_output()?;
    for mut child in children {
        child.wait()?;
    }

    Ok(PipelineOutput {
        status: exit_code(output.status),
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

fn abort(children: Vec<Child>) {
    for mut child in children {
        let _ = child.kill();
        let _ = child.wait();
    }
}

/// Run a pipeline and print what its last stage produced.
///
/// Returns the last stage's exit code, 127 when a program is missing and 1
/// for any other failure.
pub fn run(
    pipeline: &Pipeline,
    env: &Environment,
    background: bool,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> ExitCode {
    match execute(pipeline, env, background) {
        Ok(output) => {
            let _ = out.write_all(&output.stdout);
            let _ = err.write_all(&output.stderr);
            let _ = out.flush();
            output.status
        }
        Err(e @ ShellError::CommandNotFound(_)) => {
            style::report(err, "", &e);
            e.exit_code()
        }
        Err(e) => {
            style::report(err, "", format!("Error executing command: {e}"));
            e.exit_code()
        }
    }
}
