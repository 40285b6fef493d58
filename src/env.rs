use regex::{Captures, Regex};
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;
use std::sync::LazyLock;

static VAR_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\w+|\{[^}]*\})").expect("variable pattern is valid"));

/// Variables and working directory of the shell session.
///
/// Children and substitutions are started with exactly these variables and
/// this directory; the process's own environment is only read once, at startup.
/// Background jobs run against a clone taken at submit time, so nothing outside
/// the interpreter thread ever mutates this.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Seeded from the process environment; `export` and `NAME=value` add to it.
    pub vars: HashMap<String, String>,
    /// Directory used for relative paths and for every spawned process.
    pub current_dir: PathBuf,
    /// Set by `exit`.
    pub should_exit: bool,
}

impl Environment {
    /// Snapshot of the process environment and working directory.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            should_exit: false,
        }
    }

    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    /// Set or override an environment variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        let key = key.into();
        let val = val.into();
        tracing::debug!(%key, %val, "set variable");
        self.vars.insert(key, val);
    }

    /// The user's home directory: `$HOME` first, then the platform default.
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.get_var("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
    }

    /// Replace `$NAME` and `${NAME}` with their values.
    ///
    /// Unknown variables are left untouched, so `echo $NOPE` prints `$NOPE`.
    pub fn expand_vars(&self, text: &str) -> String {
        VAR_REF
            .replace_all(text, |caps: &Captures<'_>| {
                let name = caps[1].trim_start_matches('{').trim_end_matches('}');
                self.get_var(name).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Replace a leading `~` (alone or followed by `/`) with the home directory.
    pub fn expand_user(&self, text: &str) -> String {
        let rest = match text.strip_prefix('~') {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => return text.to_string(),
        };
        match self.home_dir() {
            Some(home) => format!("{}{}", home.display(), rest),
            None => text.to_string(),
        }
    }

    /// Variables first, then `~`, and resolve relative results against `current_dir`.
    pub fn resolve_path(&self, text: &str) -> PathBuf {
        let expanded = PathBuf::from(self.expand_user(&self.expand_vars(text)));
        if expanded.is_absolute() {
            expanded
        } else {
            self.current_dir.join(expanded)
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::env::Environment;
    use std::collections::HashMap;
    use std::env as stdenv;
    use std::path::PathBuf;

    fn empty_env() -> Environment {
        Environment {
            vars: HashMap::new(),
            current_dir: stdenv::current_dir().unwrap(),
            should_exit: false,
        }
    }

    #[test]
    fn set_var_overrides_and_get_var_reads() {
        let mut env = empty_env();

        assert_eq!(env.get_var("CUSTOM_SHELL_UNSET"), None);

        env.set_var("EDITOR", "vi");
        env.set_var("EDITOR", "nano");

        assert_eq!(env.get_var("EDITOR").as_deref(), Some("nano"));
    }

    #[test]
    fn new_copies_process_variables() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
    }

    #[test]
    fn expand_vars_handles_both_forms_and_keeps_unknown() {
        let mut env = empty_env();
        env.set_var("X", "1");
        env.set_var("NAME", "world");
        assert_eq!(env.expand_vars("$X"), "1");
        assert_eq!(env.expand_vars("hello ${NAME}!"), "hello world!");
        assert_eq!(env.expand_vars("$UNSET_FOR_TEST and $X"), "$UNSET_FOR_TEST and 1");
        assert_eq!(env.expand_vars("cost: $"), "cost: $");
    }

    #[test]
    fn expand_user_only_touches_leading_tilde() {
        let mut env = empty_env();
        env.set_var("HOME", "/home/tester");
        assert_eq!(env.expand_user("~"), "/home/tester");
        assert_eq!(env.expand_user("~/src"), "/home/tester/src");
        assert_eq!(env.expand_user("~other"), "~other");
        assert_eq!(env.expand_user("a/~"), "a/~");
    }

    #[test]
    fn resolve_path_joins_relative_paths_to_current_dir() {
        let mut env = empty_env();
        env.current_dir = PathBuf::from("/work");
        env.set_var("SUB", "nested");
        assert_eq!(env.resolve_path("$SUB/file"), PathBuf::from("/work/nested/file"));
        assert_eq!(env.resolve_path("/abs"), PathBuf::from("/abs"));
    }
}
