use crate::help;
use crate::interpreter::Interpreter;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

/// Tab completion for the line editor.
///
/// Holds a snapshot of the interpreter state it needs; the loop refreshes it
/// before every prompt with [`ShellHelper::sync`].
#[derive(Debug, Default)]
pub(crate) struct ShellHelper {
    cwd: PathBuf,
    home: Option<PathBuf>,
    aliases: Vec<String>,
}

impl ShellHelper {
    pub(crate) fn sync(&mut self, shell: &Interpreter) {
        self.cwd = shell.env().current_dir.clone();
        self.home = shell.env().home_dir();
        self.aliases = shell.aliases().names().map(str::to_string).collect();
    }

    fn candidates(&self, line: &str, pos: usize) -> (usize, Vec<Pair>) {
        let line_to_cursor = &line[..pos];
        let (start, word) = find_word_start(line_to_cursor);
        let before = &line_to_cursor[..start];
        let is_first_word = before.trim().is_empty() || before.trim_end().ends_with('|');

        let mut completions = Vec::new();
        if is_first_word {
            let names = help::COMMANDS
                .iter()
                .map(|c| c.name)
                .chain(self.aliases.iter().map(String::as_str));
            completions.extend(names.filter(|n| n.starts_with(word)).map(|n| Pair {
                display: n.to_string(),
                replacement: n.to_string(),
            }));
        } else if let Some(cmd) = before.split_whitespace().next().and_then(help::lookup) {
            completions.extend(
                cmd.options
                    .iter()
                    .filter(|(flag, _)| flag.starts_with(word))
                    .map(|(flag, _)| Pair {
                        display: flag.to_string(),
                        replacement: flag.to_string(),
                    }),
            );
        }
        completions.extend(self.complete_path(word));
        completions.dedup_by(|a, b| a.replacement == b.replacement);
        (start, completions)
    }

    fn complete_path(&self, word: &str) -> Vec<Pair> {
        let (dir_part, partial) = match word.rfind('/') {
            Some(slash) => (&word[..=slash], &word[slash + 1..]),
            None => ("", word),
        };
        let dir = self.resolve_dir(dir_part);
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                if !name.starts_with(partial) || (name.starts_with('.') && !partial.starts_with('.')) {
                    return None;
                }
                let is_dir = entry.path().is_dir();
                Some(if is_dir { format!("{name}/") } else { name })
            })
            .collect();
        names.sort();
        names
            .into_iter()
            .map(|name| Pair {
                replacement: format!("{dir_part}{name}"),
                display: name,
            })
            .collect()
    }

    fn resolve_dir(&self, dir_part: &str) -> PathBuf {
        if dir_part.is_empty() {
            return self.cwd.clone();
        }
        if let (Some(rest), Some(home)) = (dir_part.strip_prefix('~'), &self.home) {
            return home.join(rest.trim_start_matches('/'));
        }
        let path = Path::new(dir_part);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

fn find_word_start(line: &str) -> (usize, &str) {
    let mut start = line.len();
    for (i, c) in line.char_indices().rev() {
        if c.is_whitespace() || c == '|' || c == '&' {
            break;
        }
        start = i;
    }
    (start, &line[start..])
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok(self.candidates(line, pos))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for ShellHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Borrowed(hint)
    }
}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}

#[cfg(test)]
mod tests {
    use super::*;

    fn helper(cwd: &Path) -> ShellHelper {
        ShellHelper {
            cwd: cwd.to_path_buf(),
            home: Some(cwd.to_path_buf()),
            aliases: vec!["ll".to_string(), "gs".to_string()],
        }
    }

    fn replacements(pairs: &[Pair]) -> Vec<&str> {
        pairs.iter().map(|p| p.replacement.as_str()).collect()
    }

    #[test]
    fn first_word_offers_builtins_and_aliases() {
        let tmp = tempfile::tempdir().unwrap();
        let h = helper(tmp.path());
        let (start, pairs) = h.candidates("ex", 2);
        assert_eq!(start, 0);
        assert_eq!(replacements(&pairs), ["export", "exit"]);

        let (_, pairs) = h.candidates("l", 1);
        assert_eq!(replacements(&pairs), ["ls", "ll"]);
    }

    #[test]
    fn later_words_offer_flags_then_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("-rfile"), "").unwrap();
        let h = helper(tmp.path());
        let (start, pairs) = h.candidates("rm -r", 5);
        assert_eq!(start, 3);
        assert_eq!(replacements(&pairs), ["-r", "-rfile"]);
    }

    #[test]
    fn paths_complete_inside_directories() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src/main.rs"), "").unwrap();
        fs::write(tmp.path().join("src/.hidden"), "").unwrap();
        let h = helper(tmp.path());

        let (_, pairs) = h.candidates("cat s", 5);
        assert_eq!(replacements(&pairs), ["src/"]);

        let (start, pairs) = h.candidates("cat src/", 8);
        assert_eq!(start, 4);
        assert_eq!(replacements(&pairs), ["src/main.rs"]);

        let (_, pairs) = h.candidates("cat ~/src/m", 11);
        assert_eq!(replacements(&pairs), ["~/src/main.rs"]);
    }

    #[test]
    fn after_pipe_is_a_command_position() {
        let tmp = tempfile::tempdir().unwrap();
        let h = helper(tmp.path());
        let (start, pairs) = h.candidates("ls | ech", 8);
        assert_eq!(start, 5);
        assert_eq!(replacements(&pairs), ["echo"]);
    }
}
