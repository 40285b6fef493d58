use crate::alias::{self, AliasTable};
use crate::command::{CommandFactory, ExitCode};
use crate::env::Environment;
use crate::error::{ShellError, ShellResult};
use crate::history::History;
use crate::io_adapters::Streams;
use crate::jobs::JobTable;
use crate::lexer;
use crate::pipeline::{self, Pipeline};
use crate::style;
use crate::substitution::{self, CommandRunner, SystemShell};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;

/// How deeply `source` may nest before a script is refused.
const MAX_SOURCE_DEPTH: usize = 32;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate, i.e. types implementing `BuiltinCommand`.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// The command-line interpretation engine.
///
/// Owns every piece of session state: variables and working directory,
/// aliases, background jobs and history. Each line goes through
/// substitution, tokenization, the assignment check and alias resolution,
/// then runs either as a built-in or as an external pipeline.
///
/// Example
/// ```
/// use custom_shell::{Interpreter, Streams};
/// let mut sh = Interpreter::default();
/// let (mut input, mut out, mut err) = (std::io::empty(), Vec::new(), Vec::new());
/// let mut streams = Streams::new(&mut input, &mut out, &mut err);
/// assert_eq!(sh.process_command("GREETING=hello world", &mut streams), 0);
/// assert_eq!(sh.process_command("echo $GREETING", &mut streams), 0);
/// assert_eq!(String::from_utf8(out).unwrap(), "hello world\n");
/// ```
pub struct Interpreter {
    pub(crate) env: Environment,
    pub(crate) aliases: AliasTable,
    pub(crate) jobs: JobTable,
    history: History,
    runner: Box<dyn CommandRunner>,
    commands: Vec<Box<dyn CommandFactory>>,
    source_depth: usize,
}

impl Interpreter {
    /// Create an interpreter with a custom environment, substitution runner and command set.
    pub fn new(
        env: Environment,
        runner: Box<dyn CommandRunner>,
        commands: Vec<Box<dyn CommandFactory>>,
    ) -> Self {
        Self {
            env,
            aliases: AliasTable::new(),
            jobs: JobTable::new(),
            history: History::new(),
            runner,
            commands,
            source_depth: 0,
        }
    }

    /// All built-ins, substitutions through the system shell, and the given environment.
    pub fn with_env(env: Environment) -> Self {
        Self::new(env, Box::new(SystemShell), crate::builtin::default_commands())
    }

    /// Same as [`Interpreter::with_env`] but with a custom substitution runner.
    pub fn with_runner(env: Environment, runner: Box<dyn CommandRunner>) -> Self {
        Self::new(env, runner, crate::builtin::default_commands())
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// True once `exit` has run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Names of the registered built-ins, in registration order.
    pub fn builtin_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.iter().map(|factory| factory.name())
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtin_names().any(|n| n == name)
    }

    /// Interpret one line of input and return its exit status.
    ///
    /// Errors never escape: they are printed on `streams.err` and turned into
    /// a non-zero status.
    pub fn process_command(&mut self, line: &str, streams: &mut Streams<'_>) -> ExitCode {
        let expansion = substitution::expand_substitutions(line, self.runner.as_ref(), &self.env);
        for error in &expansion.errors {
            style::report(&mut *streams.err, "", error);
        }
        let expanded = expansion.line.trim();
        if expanded.is_empty() {
            return if expansion.errors.is_empty() { 0 } else { 1 };
        }
        self.history.record(line);

        let (command, background) = lexer::strip_background(expanded);
        match self.dispatch(command, background, streams) {
            Ok(code) => code,
            Err(e) => {
                style::report(&mut *streams.err, "", &e);
                e.exit_code()
            }
        }
    }

    fn dispatch(&mut self, line: &str, background: bool, streams: &mut Streams<'_>) -> ShellResult<ExitCode> {
        let tokens = lexer::tokenize(line)?;
        if tokens.is_empty() {
            return Ok(0);
        }
        if let Some((name, value)) = assignment(&tokens) {
            self.env.set_var(name, value);
            return Ok(0);
        }

        let expanded = self.aliases.expand_line(line)?.unwrap_or_else(|| line.to_string());
        if lexer::split_pipeline(&expanded).len() == 1 {
            if let Some(code) = self.run_builtin(tokens, streams)? {
                return Ok(code);
            }
        }

        let pipeline = Pipeline::parse(&expanded)?;
        if background {
            self.start_job(line.to_string(), pipeline, streams)
        } else {
            Ok(pipeline::run(&pipeline, &self.env, false, &mut *streams.out, &mut *streams.err))
        }
    }

    /// Run the line as a built-in if its (alias-resolved) name is one.
    fn run_builtin(&mut self, tokens: Vec<String>, streams: &mut Streams<'_>) -> ShellResult<Option<ExitCode>> {
        let tokens = alias::resolve_aliases(tokens, &self.aliases)?;
        let Some((name, args)) = tokens.split_first() else {
            return Ok(Some(0));
        };
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let found = self.commands.iter().find_map(|factory| factory.try_create(name, &args));
        let Some(cmd) = found else {
            return Ok(None);
        };
        tracing::debug!(builtin = %name, ?args, "running built-in");
        Ok(Some(match cmd.execute(self, streams) {
            Ok(code) => code,
            Err(e) => {
                style::report(&mut *streams.err, name, format!("{e:#}"));
                1
            }
        }))
    }

    fn start_job(&mut self, label: String, pipeline: Pipeline, streams: &mut Streams<'_>) -> ShellResult<ExitCode> {
        let env = self.env.clone();
        let started = self.jobs.submit(label, move || {
            pipeline::run(&pipeline, &env, true, &mut io::stdout(), &mut io::stderr())
        })?;
        writeln!(streams.out, "{started}")?;
        Ok(0)
    }

    /// Run every non-blank, non-comment line of `text`, stopping early after `exit`.
    ///
    /// Returns the status of the last line that ran.
    pub fn run_script(&mut self, text: &str, streams: &mut Streams<'_>) -> ExitCode {
        let mut status = 0;
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            status = self.process_command(line, streams);
            if self.should_exit() {
                break;
            }
        }
        status
    }

    /// Read `path` and run it line by line, as `source` does.
    ///
    /// Scripts may source other scripts, but a chain deeper than
    /// `MAX_SOURCE_DEPTH` is refused so a file that sources itself fails
    /// instead of exhausting the stack.
    pub fn source_file(&mut self, path: &Path, streams: &mut Streams<'_>) -> ShellResult<ExitCode> {
        if self.source_depth >= MAX_SOURCE_DEPTH {
            return Err(ShellError::InvalidArgument("maximum nesting depth exceeded".into()));
        }
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ShellError::NotFound(format!("No such file: {}", path.display())),
            _ => ShellError::Io(e),
        })?;
        tracing::debug!(path = %path.display(), depth = self.source_depth, "sourcing file");
        self.source_depth += 1;
        let status = self.run_script(&text, streams);
        self.source_depth -= 1;
        Ok(status)
    }

    /// Run the startup file if there is one. A missing file is not an error.
    pub fn load_rc(&mut self, path: &Path, streams: &mut Streams<'_>) -> ShellResult<()> {
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no startup file");
            return Ok(());
        }
        self.source_file(path, streams)?;
        Ok(())
    }
}

impl Default for Interpreter {
    /// Process environment, all built-ins, substitutions through the system shell.
    fn default() -> Self {
        Self::with_env(Environment::new())
    }
}

/// `NAME=value rest...` as (name, value), when the first token is an assignment.
///
/// The value is everything after the first `=` plus any further tokens joined by spaces.
fn assignment(tokens: &[String]) -> Option<(&str, String)> {
    let (first, rest) = tokens.split_first()?;
    let (name, value) = first.split_once('=')?;
    if name.is_empty() {
        return None;
    }
    let mut value = value.to_string();
    for token in rest {
        value.push(' ');
        value.push_str(token);
    }
    Some((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct Recorder {
        answers: HashMap<String, String>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl CommandRunner for Recorder {
        fn capture(&self, command: &str, _env: &Environment) -> ShellResult<String> {
            self.calls.lock().unwrap().push(command.to_string());
            self.answers
                .get(command)
                .cloned()
                .ok_or_else(|| ShellError::Substitution(format!("{command}: failed")))
        }
    }

    struct Session {
        shell: Interpreter,
        out: Vec<u8>,
        err: Vec<u8>,
    }

    impl Session {
        fn new(runner: Recorder) -> Self {
            Self {
                shell: Interpreter::with_runner(Environment::new(), Box::new(runner)),
                out: Vec::new(),
                err: Vec::new(),
            }
        }

        fn run(&mut self, line: &str) -> ExitCode {
            self.out.clear();
            self.err.clear();
            let mut input = Cursor::new(Vec::new());
            let mut streams = Streams::new(&mut input, &mut self.out, &mut self.err);
            self.shell.process_command(line, &mut streams)
        }

        fn out(&self) -> String {
            String::from_utf8_lossy(&self.out).into_owned()
        }

        fn err(&self) -> String {
            String::from_utf8_lossy(&self.err).into_owned()
        }
    }

    #[test]
    fn assignment_takes_rest_of_line() {
        let tokens: Vec<String> = ["X=a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(assignment(&tokens), Some(("X", "a b c".to_string())));
        assert_eq!(assignment(&["=x".to_string()]), None);
        assert_eq!(assignment(&["ls".to_string()]), None);
        assert_eq!(assignment(&["EMPTY=".to_string()]), Some(("EMPTY", String::new())));
    }

    #[test]
    fn assignment_sets_variable_without_output() {
        let mut s = Session::new(Recorder::default());
        assert_eq!(s.run("X=1"), 0);
        assert!(s.out.is_empty());
        assert!(s.err.is_empty());
        assert_eq!(s.run("echo $X"), 0);
        assert_eq!(s.out(), "1\n");
    }

    #[test]
    fn blank_and_whitespace_lines_do_nothing() {
        let mut s = Session::new(Recorder::default());
        assert_eq!(s.run(""), 0);
        assert_eq!(s.run("   "), 0);
        assert!(s.shell.history().entries().is_empty());
    }

    #[test]
    fn parse_errors_are_reported_with_status_2() {
        let mut s = Session::new(Recorder::default());
        assert_eq!(s.run("echo 'unterminated"), 2);
        assert!(s.err().contains("no closing quotation"), "{}", s.err());
    }

    #[test]
    fn substitution_output_feeds_the_command() {
        let mut runner = Recorder::default();
        runner.answers.insert("whoami".into(), "tester\n".into());
        let calls = runner.calls.clone();
        let mut s = Session::new(runner);

        assert_eq!(s.run("echo hello $(whoami)"), 0);
        assert_eq!(s.out(), "hello tester\n");
        assert_eq!(*calls.lock().unwrap(), ["whoami"]);
    }

    #[test]
    fn failed_substitution_is_reported_and_line_still_runs() {
        let mut s = Session::new(Recorder::default());
        assert_eq!(s.run("echo a `broken` b"), 0);
        assert_eq!(s.out(), "a b\n");
        assert!(s.err().contains("Error in command substitution: broken: failed"));
    }

    #[test]
    fn history_keeps_line_before_substitution() {
        let mut runner = Recorder::default();
        runner.answers.insert("date".into(), "today".into());
        let mut s = Session::new(runner);
        s.run("echo $(date)");
        assert_eq!(s.shell.history().entries(), ["echo $(date)"]);
    }

    #[test]
    fn aliases_resolve_to_builtins_once() {
        let mut s = Session::new(Recorder::default());
        assert_eq!(s.run("alias say='echo said'"), 0);
        assert_eq!(s.run("say hi"), 0);
        assert_eq!(s.out(), "said hi\n");

        assert_eq!(s.run("alias echo='echo again'"), 0);
        assert_eq!(s.run("echo x"), 0);
        assert_eq!(s.out(), "again x\n");
    }

    #[test]
    fn builtins_ignore_background_marker() {
        let mut s = Session::new(Recorder::default());
        assert_eq!(s.run("echo now &"), 0);
        assert_eq!(s.out(), "now\n");
        assert!(s.shell.jobs().is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn builtin_names_inside_pipelines_run_as_programs() {
        let mut s = Session::new(Recorder::default());
        assert_eq!(s.run("echo one two | wc -w"), 0);
        assert_eq!(s.out().trim(), "2");
    }

    #[test]
    fn exit_stops_scripts() {
        let mut s = Session::new(Recorder::default());
        let mut input = Cursor::new(Vec::new());
        let mut streams = Streams::new(&mut input, &mut s.out, &mut s.err);
        let status = s.shell.run_script("# comment\n\necho one\nexit\necho two\n", &mut streams);
        assert_eq!(status, 0);
        assert!(s.shell.should_exit());
        let out = String::from_utf8_lossy(&s.out);
        assert!(out.starts_with("one\n"));
        assert!(!out.contains("two"));
    }

    #[test]
    fn missing_rc_file_is_fine() {
        let tmp = tempfile::tempdir().unwrap();
        let mut s = Session::new(Recorder::default());
        let mut input = Cursor::new(Vec::new());
        let mut streams = Streams::new(&mut input, &mut s.out, &mut s.err);
        assert!(s.shell.load_rc(&tmp.path().join("absent"), &mut streams).is_ok());
    }

    #[test]
    fn rc_file_defines_aliases_and_variables() {
        let tmp = tempfile::tempdir().unwrap();
        let rc = tmp.path().join("rc");
        fs::write(&rc, "# startup\nalias hi='echo hello'\nexport WHO=me\n").unwrap();

        let mut s = Session::new(Recorder::default());
        {
            let mut input = Cursor::new(Vec::new());
            let mut streams = Streams::new(&mut input, &mut s.out, &mut s.err);
            s.shell.load_rc(&rc, &mut streams).unwrap();
        }
        assert_eq!(s.run("hi $WHO"), 0);
        assert_eq!(s.out(), "hello me\n");
    }

    #[test]
    fn self_sourcing_script_stops_at_nesting_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("loop.sh");
        fs::write(&script, format!("source {}\n", script.display())).unwrap();

        let mut s = Session::new(Recorder::default());
        assert_eq!(s.run(&format!("source {}", script.display())), 1);
        assert_eq!(s.err().matches("source: maximum nesting depth exceeded").count(), 1, "{}", s.err());

        assert_eq!(s.run("echo still here"), 0);
        assert_eq!(s.out(), "still here\n");
    }

    #[test]
    #[cfg(unix)]
    fn external_pipeline_runs_in_foreground() {
        let mut s = Session::new(Recorder::default());
        assert_eq!(s.run("printf 'b\\na\\n' | sort"), 0);
        assert_eq!(s.out(), "a\nb\n");
    }

    #[test]
    #[cfg(unix)]
    fn missing_program_reports_127() {
        let mut s = Session::new(Recorder::default());
        assert_eq!(s.run("no-such-program-for-tests"), 127);
        assert!(s.err().contains("Command not found: no-such-program-for-tests"));
    }

    #[test]
    #[cfg(unix)]
    fn background_job_is_announced_and_foregrounded() {
        let mut s = Session::new(Recorder::default());
        assert_eq!(s.run("sleep 0.1 &"), 0);
        assert!(s.out().starts_with("[1] "), "{}", s.out());
        assert!(s.out().trim_end().ends_with("Started 'sleep 0.1'"), "{}", s.out());

        assert_eq!(s.run("jobs"), 0);
        assert!(s.out().starts_with("[1] "));
        assert!(s.out().trim_end().ends_with("sleep 0.1"));

        assert_eq!(s.run("fg 1"), 0);
        assert_eq!(s.out(), "Brought job [1] to foreground\n");
        assert!(s.shell.jobs().is_empty());
    }
}
