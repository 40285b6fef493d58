//! Command-line options and the default locations of the files the shell reads and writes.

use argh::FromArgs;
use std::path::PathBuf;

const RC_FILE: &str = ".custom_shellrc";
const LOG_FILE: &str = ".custom_shell.log";

#[derive(FromArgs, Debug, PartialEq)]
/// An interactive shell with aliases, pipelines, command substitution and background jobs.
pub struct Options {
    #[argh(option, short = 'c')]
    /// run one command line and exit with its status.
    pub command: Option<String>,

    #[argh(option)]
    /// startup file to read instead of ~/.custom_shellrc.
    pub rc: Option<PathBuf>,

    #[argh(switch)]
    /// do not read any startup file.
    pub no_rc: bool,

    #[argh(option)]
    /// where diagnostics are written; defaults to ~/.custom_shell.log.
    pub log_file: Option<PathBuf>,

    #[argh(positional)]
    /// script to run instead of starting the interactive loop.
    pub script: Option<PathBuf>,
}

impl Options {
    /// Startup file to read, or `None` when `--no-rc` was given.
    pub fn rc_path(&self) -> Option<PathBuf> {
        if self.no_rc {
            return None;
        }
        self.rc.clone().or_else(|| home_file(RC_FILE))
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .or_else(|| home_file(LOG_FILE))
            .unwrap_or_else(|| PathBuf::from(LOG_FILE))
    }
}

fn home_file(name: &str) -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Options {
        Options::from_args(&["custom_shell"], args).expect("valid options")
    }

    #[test]
    fn defaults_to_interactive_with_rc() {
        let opts = parse(&[]);
        assert_eq!(opts.command, None);
        assert_eq!(opts.script, None);
        if let Some(home) = dirs::home_dir() {
            assert_eq!(opts.rc_path(), Some(home.join(".custom_shellrc")));
            assert_eq!(opts.log_path(), home.join(".custom_shell.log"));
        }
    }

    #[test]
    fn explicit_paths_win() {
        let opts = parse(&["--rc", "/tmp/rc", "--log-file", "/tmp/log", "-c", "echo hi"]);
        assert_eq!(opts.rc_path(), Some(PathBuf::from("/tmp/rc")));
        assert_eq!(opts.log_path(), PathBuf::from("/tmp/log"));
        assert_eq!(opts.command.as_deref(), Some("echo hi"));
    }

    #[test]
    fn no_rc_disables_startup_file() {
        let opts = parse(&["--no-rc", "--rc", "/tmp/rc", "script.sh"]);
        assert_eq!(opts.rc_path(), None);
        assert_eq!(opts.script, Some(PathBuf::from("script.sh")));
    }
}
