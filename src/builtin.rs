use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::error::ShellError;
use crate::help;
use crate::interpreter::{Factory, Interpreter};
use crate::io_adapters::Streams;
use crate::jobs::JobId;
use crate::style::{self, BLUE, GREEN, RESET, YELLOW};
use anyhow::{Context, Result, bail};
use argh::{EarlyExit, FromArgs};
use std::fs::{self, Metadata};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process. They always run synchronously,
/// even when the line ends in `&`.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// One-letter switches that may be combined into a single word, as in `ls -la`.
    const BUNDLED_SWITCHES: &'static str = "";

    /// Executes the command against the interpreter state.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, shell: &mut Interpreter, streams: &mut Streams<'_>) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, shell: &mut Interpreter, streams: &mut Streams<'_>) -> Result<ExitCode> {
        match <T as BuiltinCommand>::execute(*self, shell, streams) {
            Ok(x) => Ok(x),
            Err(e) => {
                style::report(&mut *streams.err, T::name(), format!("{e:#}"));
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, _shell: &mut Interpreter, streams: &mut Streams<'_>) -> Result<ExitCode> {
        if self.is_error {
            streams.err.write_all(self.output.as_bytes())?;
            writeln!(streams.err)?;
            Ok(1)
        } else {
            streams.out.write_all(self.output.as_bytes())?;
            Ok(0)
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn name(&self) -> &'static str {
        T::name()
    }

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        let args = split_switches(args, T::BUNDLED_SWITCHES);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        Some(match T::from_args(&[name], &args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

/// Rewrite `-la` as `-l -a` when every letter is one of `switches`. Stops at `--`.
fn split_switches(args: &[&str], switches: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut options_ended = false;
    for &arg in args {
        match arg.strip_prefix('-') {
            Some(letters) if !options_ended && letters.len() > 1 && letters.chars().all(|c| switches.contains(c)) => {
                out.extend(letters.chars().map(|c| format!("-{c}")));
            }
            _ => {
                options_ended |= arg == "--";
                out.push(arg.to_string());
            }
        }
    }
    out
}

/// Every built-in, in the order `help` lists them.
pub(crate) fn default_commands() -> Vec<Box<dyn CommandFactory>> {
    vec![
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<Ls>::default()),
        Box::new(Factory::<Mkdir>::default()),
        Box::new(Factory::<Rm>::default()),
        Box::new(Factory::<Cp>::default()),
        Box::new(Factory::<Mv>::default()),
        Box::new(Factory::<Pwd>::default()),
        Box::new(Factory::<Alias>::default()),
        Box::new(Factory::<Unalias>::default()),
        Box::new(Factory::<Export>::default()),
        Box::new(Factory::<Echo>::default()),
        Box::new(Factory::<Jobs>::default()),
        Box::new(Factory::<Fg>::default()),
        Box::new(Factory::<Source>::default()),
        Box::new(Factory::<Help>::default()),
        Box::new(Factory::<Exit>::default()),
    ]
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
#[argh(help_triggers("--help"))]
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, shell: &mut Interpreter, streams: &mut Streams<'_>) -> Result<ExitCode> {
        writeln!(streams.out, "{}", shell.env.current_dir.to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the home directory.
#[argh(help_triggers("--help"))]
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; `~` and $VARS are expanded. Defaults to ~ when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, shell: &mut Interpreter, _streams: &mut Streams<'_>) -> Result<ExitCode> {
        let target = self.target.unwrap_or_else(|| "~".to_string());
        let new_dir = shell.env.resolve_path(&target);

        let metadata = match fs::metadata(&new_dir) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ShellError::NotFound(format!("No such directory: {}", new_dir.display())).into());
            }
            Err(e) => return Err(e).with_context(|| format!("can't access {}", new_dir.display())),
        };
        if !metadata.is_dir() {
            bail!("Not a directory: {}", new_dir.display());
        }

        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("can't canonicalize {}", new_dir.display()))?;
        tracing::debug!(dir = %canonical.display(), "changing directory");
        shell.env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List the contents of the current directory.
#[argh(help_triggers("--help"))]
pub struct Ls {
    #[argh(switch, short = 'l')]
    /// show permissions, size and modification time.
    pub long: bool,

    #[argh(switch, short = 'a')]
    /// include entries whose names start with a dot.
    pub all: bool,
}

impl BuiltinCommand for Ls {
    const BUNDLED_SWITCHES: &'static str = "la";

    fn name() -> &'static str {
        "ls"
    }

    fn execute(self, shell: &mut Interpreter, streams: &mut Streams<'_>) -> Result<ExitCode> {
        let dir = &shell.env.current_dir;
        let mut names = fs::read_dir(dir)
            .with_context(|| format!("can't read {}", dir.display()))?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<std::io::Result<Vec<_>>>()?;
        names.retain(|n| self.all || !n.starts_with('.'));
        names.sort();

        for name in names {
            let path = dir.join(&name);
            let metadata = fs::metadata(&path).or_else(|_| fs::symlink_metadata(&path))?;
            let shown = if metadata.is_dir() {
                style::paint(BLUE, &name)
            } else {
                name
            };
            if self.long {
                writeln!(
                    streams.out,
                    "{} {:>8} {} {}",
                    mode_string(&metadata),
                    metadata.len(),
                    modified_string(&metadata),
                    shown
                )?;
            } else {
                writeln!(streams.out, "{shown}")?;
            }
        }
        Ok(0)
    }
}

/// `drwxr-xr-x` style rendering of a file's type and permission bits.
#[cfg(unix)]
fn mode_string(metadata: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    let mode = metadata.permissions().mode();
    let kind = if metadata.is_dir() {
        'd'
    } else if metadata.file_type().is_symlink() {
        'l'
    } else {
        '-'
    };
    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

#[cfg(not(unix))]
fn mode_string(metadata: &Metadata) -> String {
    let kind = if metadata.is_dir() { 'd' } else { '-' };
    let rw = if metadata.permissions().readonly() { "r--" } else { "rw-" };
    format!("{kind}{rw}{rw}{rw}")
}

fn modified_string(metadata: &Metadata) -> String {
    match metadata.modified() {
        Ok(time) => chrono::DateTime::<chrono::Local>::from(time)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        Err(_) => "????-??-?? ??:??".to_string(),
    }
}

#[derive(FromArgs)]
/// Create a new directory. Fails if it already exists.
#[argh(help_triggers("--help"))]
pub struct Mkdir {
    #[argh(positional)]
    /// directory to create; missing parents are created too.
    pub name: String,
}

impl BuiltinCommand for Mkdir {
    fn name() -> &'static str {
        "mkdir"
    }

    fn execute(self, shell: &mut Interpreter, _streams: &mut Streams<'_>) -> Result<ExitCode> {
        let path = shell.env.resolve_path(&self.name);
        if path.exists() {
            bail!("Directory '{}' already exists.", self.name);
        }
        fs::create_dir_all(&path).with_context(|| format!("can't create {}", path.display()))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Remove files or directories matching glob patterns.
#[argh(help_triggers("--help"))]
pub struct Rm {
    #[argh(switch, short = 'r')]
    /// recursively remove directories and their contents.
    pub recursive: bool,

    #[argh(switch, short = 'f')]
    /// never prompt and ignore patterns that match nothing.
    pub force: bool,

    #[argh(positional)]
    /// glob patterns naming what to remove.
    pub patterns: Vec<String>,
}

impl Rm {
    fn remove(&self, item: &Path, streams: &mut Streams<'_>) -> Result<()> {
        let metadata = fs::symlink_metadata(item)?;
        if metadata.is_dir() {
            if !self.recursive {
                bail!("cannot remove '{}': Is a directory", item.display());
            }
            let question = format!("rm: remove directory '{}' and its contents?", item.display());
            if self.force || streams.confirm(&question)? {
                fs::remove_dir_all(item)?;
            }
        } else {
            let question = format!("rm: remove file '{}'?", item.display());
            if self.force || streams.confirm(&question)? {
                fs::remove_file(item)?;
            }
        }
        Ok(())
    }
}

impl BuiltinCommand for Rm {
    const BUNDLED_SWITCHES: &'static str = "rf";

    fn name() -> &'static str {
        "rm"
    }

    fn execute(self, shell: &mut Interpreter, streams: &mut Streams<'_>) -> Result<ExitCode> {
        if self.patterns.is_empty() {
            bail!("missing operand");
        }
        let mut status = 0;
        for pattern in &self.patterns {
            let full = shell.env.resolve_path(pattern);
            let matches: Vec<PathBuf> = glob::glob(&full.to_string_lossy())
                .with_context(|| format!("invalid pattern '{pattern}'"))?
                .filter_map(|entry| entry.ok())
                .collect();

            if matches.is_empty() {
                if !self.force {
                    style::report(&mut *streams.err, "rm", format!("No such file or directory: {pattern}"));
                    status = 1;
                }
                continue;
            }
            for item in matches {
                if let Err(e) = self.remove(&item, streams) {
                    style::report(&mut *streams.err, "rm", format!("{e:#}"));
                    status = 1;
                }
            }
        }
        Ok(status)
    }
}

#[derive(FromArgs)]
/// Copy a file or a whole directory tree.
#[argh(help_triggers("--help"))]
pub struct Cp {
    #[argh(positional)]
    /// file or directory to copy.
    pub source: String,

    #[argh(positional)]
    /// destination path; a file is copied into it when it is an existing directory.
    pub destination: String,
}

impl BuiltinCommand for Cp {
    fn name() -> &'static str {
        "cp"
    }

    fn execute(self, shell: &mut Interpreter, _streams: &mut Streams<'_>) -> Result<ExitCode> {
        let source = shell.env.resolve_path(&self.source);
        let destination = shell.env.resolve_path(&self.destination);
        if source.is_dir() {
            copy_tree(&source, &destination)?;
        } else {
            let target = into_dir(&source, destination);
            fs::copy(&source, &target)
                .with_context(|| format!("can't copy {} to {}", source.display(), target.display()))?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Move or rename a file or directory.
#[argh(help_triggers("--help"))]
pub struct Mv {
    #[argh(positional)]
    /// file or directory to move.
    pub source: String,

    #[argh(positional)]
    /// new path; the source is moved into it when it is an existing directory.
    pub destination: String,
}

impl BuiltinCommand for Mv {
    fn name() -> &'static str {
        "mv"
    }

    fn execute(self, shell: &mut Interpreter, _streams: &mut Streams<'_>) -> Result<ExitCode> {
        let source = shell.env.resolve_path(&self.source);
        if !source.exists() {
            return Err(ShellError::NotFound(format!("No such file or directory: {}", self.source)).into());
        }
        let target = into_dir(&source, shell.env.resolve_path(&self.destination));
        match fs::rename(&source, &target) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::CrossesDevices => {
                if source.is_dir() {
                    copy_tree(&source, &target)?;
                    fs::remove_dir_all(&source)?;
                } else {
                    fs::copy(&source, &target)?;
                    fs::remove_file(&source)?;
                }
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("can't move {} to {}", source.display(), target.display()));
            }
        }
        Ok(0)
    }
}

/// `dest/<source name>` when `dest` is an existing directory, else `dest`.
fn into_dir(source: &Path, destination: PathBuf) -> PathBuf {
    match source.file_name() {
        Some(name) if destination.is_dir() => destination.join(name),
        _ => destination,
    }
}

fn copy_tree(source: &Path, destination: &Path) -> Result<()> {
    fs::create_dir(destination).with_context(|| format!("can't create {}", destination.display()))?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let from = entry.path();
        let to = destination.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            fs::copy(&from, &to).with_context(|| format!("can't copy {}", from.display()))?;
        }
    }
    Ok(())
}

#[derive(FromArgs)]
/// Define or display aliases. Without arguments, list them all.
#[argh(help_triggers("--help"))]
pub struct Alias {
    #[argh(positional, greedy)]
    /// definitions: `name=command` to define, or `name` to display.
    pub definitions: Vec<String>,
}

impl BuiltinCommand for Alias {
    fn name() -> &'static str {
        "alias"
    }

    fn execute(self, shell: &mut Interpreter, streams: &mut Streams<'_>) -> Result<ExitCode> {
        if self.definitions.is_empty() {
            for (name, value) in shell.aliases.iter() {
                writeln!(streams.out, "{YELLOW}{name}='{value}'{RESET}")?;
            }
            return Ok(0);
        }
        for definition in &self.definitions {
            match definition.split_once('=') {
                Some((name, value)) if !name.is_empty() => shell.aliases.set(name, value),
                Some(_) => bail!("invalid alias definition '{definition}'"),
                None => match shell.aliases.get(definition) {
                    Some(value) => writeln!(streams.out, "{YELLOW}{definition}='{value}'{RESET}")?,
                    None => return Err(ShellError::NotFound(format!("{definition}: not found")).into()),
                },
            }
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Remove an alias.
#[argh(help_triggers("--help"))]
pub struct Unalias {
    #[argh(positional)]
    /// alias to remove.
    pub name: String,
}

impl BuiltinCommand for Unalias {
    fn name() -> &'static str {
        "unalias"
    }

    fn execute(self, shell: &mut Interpreter, _streams: &mut Streams<'_>) -> Result<ExitCode> {
        match shell.aliases.remove(&self.name) {
            Some(_) => Ok(0),
            None => Err(ShellError::NotFound(format!("{}: not found", self.name)).into()),
        }
    }
}

#[derive(FromArgs)]
/// Set environment variables for this shell and the commands it runs.
#[argh(help_triggers("--help"))]
pub struct Export {
    #[argh(positional, greedy)]
    /// one or more assignments of the form `NAME=value`.
    pub assignments: Vec<String>,
}

impl BuiltinCommand for Export {
    fn name() -> &'static str {
        "export"
    }

    fn execute(self, shell: &mut Interpreter, _streams: &mut Streams<'_>) -> Result<ExitCode> {
        let invalid = || ShellError::InvalidArgument("invalid format. Use 'export NAME=value'".into());
        if self.assignments.is_empty() {
            return Err(invalid().into());
        }
        for assignment in &self.assignments {
            match assignment.split_once('=') {
                Some((name, value)) if !name.is_empty() => shell.env.set_var(name, value),
                _ => return Err(invalid().into()),
            }
        }
        Ok(0)
    }
}

/// Write the arguments to standard output, separated by spaces, with $VARS expanded.
///
/// Only a leading `-n` is an option. Every other word, including `help` and
/// anything starting with a dash, is printed as given.
pub struct Echo {
    /// do not output the trailing newline.
    pub no_newline: bool,
    /// values to print, separated by spaces.
    pub args: Vec<String>,
}

impl FromArgs for Echo {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        let (no_newline, words) = match args.split_first() {
            Some((&"-n", rest)) => (true, rest),
            _ => (false, args),
        };
        Ok(Echo {
            no_newline,
            args: words.iter().map(|w| w.to_string()).collect(),
        })
    }
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(self, shell: &mut Interpreter, streams: &mut Streams<'_>) -> Result<ExitCode> {
        let s = shell.env.expand_vars(&self.args.join(" "));
        if self.no_newline {
            write!(streams.out, "{}", s)?;
        } else {
            writeln!(streams.out, "{}", s)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List background jobs.
#[argh(help_triggers("--help"))]
pub struct Jobs {}

impl BuiltinCommand for Jobs {
    fn name() -> &'static str {
        "jobs"
    }

    fn execute(self, shell: &mut Interpreter, streams: &mut Streams<'_>) -> Result<ExitCode> {
        for line in shell.jobs.list() {
            writeln!(streams.out, "{line}")?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Wait for a background job and remove it from the job list.
#[argh(help_triggers("--help"))]
pub struct Fg {
    #[argh(positional)]
    /// job id as printed by `jobs`.
    pub job_id: JobId,
}

impl BuiltinCommand for Fg {
    fn name() -> &'static str {
        "fg"
    }

    fn execute(self, shell: &mut Interpreter, streams: &mut Streams<'_>) -> Result<ExitCode> {
        let code = shell.jobs.bring_to_foreground(self.job_id)?;
        writeln!(streams.out, "Brought job [{}] to foreground", self.job_id)?;
        Ok(code)
    }
}

#[derive(FromArgs)]
/// Execute each line of a file as a command.
#[argh(help_triggers("--help"))]
pub struct Source {
    #[argh(positional)]
    /// script to run; blank lines and lines starting with # are skipped.
    pub file: String,
}

impl BuiltinCommand for Source {
    fn name() -> &'static str {
        "source"
    }

    fn execute(self, shell: &mut Interpreter, streams: &mut Streams<'_>) -> Result<ExitCode> {
        let path = shell.env.resolve_path(&self.file);
        Ok(shell.source_file(&path, streams)?)
    }
}

#[derive(FromArgs)]
/// Show general help, or usage for one command.
#[argh(help_triggers("--help"))]
pub struct Help {
    #[argh(positional)]
    /// command to describe.
    pub command: Option<String>,
}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn execute(self, _shell: &mut Interpreter, streams: &mut Streams<'_>) -> Result<ExitCode> {
        let text = match &self.command {
            Some(name) => help::for_command(name),
            None => help::general(),
        };
        write!(streams.out, "{text}")?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Exit shell process
#[argh(help_triggers("--help"))]
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, shell: &mut Interpreter, streams: &mut Streams<'_>) -> Result<ExitCode> {
        writeln!(streams.out, "{GREEN}Exiting Custom Shell. Goodbye!{RESET}")?;
        shell.env.should_exit = true;
        Ok(0)
    }
}
