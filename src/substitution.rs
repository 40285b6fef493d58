//! Command substitution: `` `cmd` `` and `$(cmd)`.
//!
//! The leftmost span is run through the system command interpreter, its
//! output (minus trailing whitespace) replaces the span, and the scan resumes
//! right after the inserted text. Inserted text is never scanned again, so the
//! unscanned remainder of the line shrinks on every pass and the loop always
//! terminates, whatever the commands print.

use crate::env::Environment;
use crate::error::{ShellError, ShellResult};
use regex::Regex;
use std::process::Command;
use std::sync::LazyLock;

static SUBSTITUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"`([^`]+)`|\$\(([^)]+)\)").expect("substitution pattern is valid")
});

/// Runs the inner text of a substitution and returns what it printed.
///
/// The interpreter owns one of these so tests can swap in a fake.
pub trait CommandRunner {
    fn capture(&self, command: &str, env: &Environment) -> ShellResult<String>;
}

/// Runs substitutions through `sh -c` (`cmd /C` on Windows).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

impl CommandRunner for SystemShell {
    fn capture(&self, command: &str, env: &Environment) -> ShellResult<String> {
        let output = system_command(command)
            .envs(env.vars.iter())
            .current_dir(&env.current_dir)
            .output()
            .map_err(|e| ShellError::Substitution(format!("{command}: {e}")))?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = [stderr.trim(), stdout.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("'{command}' exited with {}", output.status));
        Err(ShellError::Substitution(detail))
    }
}

#[cfg(unix)]
fn system_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(not(unix))]
fn system_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// A line after substitution, plus every substitution that failed along the way.
#[derive(Debug)]
pub struct Expansion {
    pub line: String,
    pub errors: Vec<ShellError>,
}

/// Replace every substitution span in `line`, left to right.
///
/// A failing span becomes the empty string and its error is collected; the
/// rest of the line is still expanded. An unclosed `$(` is left as written.
pub fn expand_substitutions(line: &str, runner: &dyn CommandRunner, env: &Environment) -> Expansion {
    let mut text = line.to_string();
    let mut errors = Vec::new();
    let mut cursor = 0;

    while let Some(caps) = SUBSTITUTION.captures_at(&text, cursor) {
        let Some(span) = caps.get(0).map(|m| m.range()) else {
            break;
        };
        let inner = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        tracing::debug!(command = %inner, "running command substitution");
        let replacement = match runner.capture(&inner, env) {
            Ok(output) => output.trim_end().to_string(),
            Err(err) => {
                tracing::warn!(command = %inner, error = %err, "substitution failed");
                errors.push(err);
                String::new()
            }
        };

        text.replace_range(span.clone(), &replacement);
        cursor = span.start + replacement.len();
    }

    Expansion { line: text, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers from a fixed table and remembers what it was asked.
    struct FakeRunner {
        answers: HashMap<&'static str, ShellResult<&'static str>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeRunner {
        fn new(answers: Vec<(&'static str, ShellResult<&'static str>)>) -> Self {
            Self {
                answers: answers.into_iter().collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for FakeRunner {
        fn capture(&self, command: &str, _env: &Environment) -> ShellResult<String> {
            self.calls.lock().unwrap().push(command.to_string());
            match self.answers.get(command) {
                Some(Ok(out)) => Ok(out.to_string()),
                Some(Err(e)) => Err(ShellError::Substitution(e.to_string())),
                None => Err(ShellError::Substitution(format!("unexpected command {command}"))),
            }
        }
    }

    fn env() -> Environment {
        Environment::new()
    }

    #[test]
    fn dollar_paren_is_replaced_by_trimmed_output() {
        let runner = FakeRunner::new(vec![("echo hi", Ok("hi\n"))]);
        let expansion = expand_substitutions("echo $(echo hi)", &runner, &env());
        assert_eq!(expansion.line, "echo hi");
        assert!(expansion.errors.is_empty());
    }

    #[test]
    fn backticks_and_multiple_spans_resolve_left_to_right() {
        let runner = FakeRunner::new(vec![("one", Ok("1\n")), ("two", Ok("2")), ("three", Ok("3 \n\n"))]);
        let expansion = expand_substitutions("x $(one) `two` $(three)!", &runner, &env());
        assert_eq!(expansion.line, "x 1 2 3!");
        assert_eq!(runner.calls(), ["one", "two", "three"]);
    }

    #[test]
    fn failing_span_becomes_empty_and_is_reported() {
        let runner = FakeRunner::new(vec![
            ("false", Err(ShellError::Substitution("boom".into()))),
            ("echo ok", Ok("ok")),
        ]);
        let expansion = expand_substitutions("echo [$(false)] $(echo ok)", &runner, &env());
        assert_eq!(expansion.line, "echo [] ok");
        assert_eq!(expansion.errors.len(), 1);
        assert!(matches!(expansion.errors[0], ShellError::Substitution(_)));
    }

    #[test]
    fn unclosed_dollar_paren_is_left_alone() {
        let runner = FakeRunner::new(vec![]);
        let expansion = expand_substitutions("echo $(never closed", &runner, &env());
        assert_eq!(expansion.line, "echo $(never closed");
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn output_that_looks_like_a_substitution_is_not_rescanned() {
        let runner = FakeRunner::new(vec![("loop", Ok("$(loop) `loop`"))]);
        let expansion = expand_substitutions("echo $(loop)", &runner, &env());
        assert_eq!(expansion.line, "echo $(loop) `loop`");
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn line_without_spans_is_untouched() {
        let runner = FakeRunner::new(vec![]);
        let expansion = expand_substitutions("echo $HOME ``", &runner, &env());
        assert_eq!(expansion.line, "echo $HOME ``");
    }

    #[test]
    #[cfg(unix)]
    fn system_shell_runs_real_commands() {
        let expansion = expand_substitutions("echo $(echo hi) `printf 'a b'`", &SystemShell, &env());
        assert_eq!(expansion.line, "echo hi a b");
        assert!(expansion.errors.is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn system_shell_reports_non_zero_exit() {
        let expansion = expand_substitutions("a$(echo bad >&2; exit 3)b", &SystemShell, &env());
        assert_eq!(expansion.line, "ab");
        match &expansion.errors[..] {
            [ShellError::Substitution(msg)] => assert_eq!(msg, "bad"),
            other => panic!("unexpected errors: {other:?}"),
        }
    }
}
