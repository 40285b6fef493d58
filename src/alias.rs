//! Alias table and the single-pass alias resolver.
//!
//! Only the command name (first word) is ever rewritten, and only once: if an
//! alias value itself starts with an aliased name, that name runs literally.
//! This keeps `alias ls='ls -a'` working without any loop detection.

use crate::error::ShellResult;
use crate::lexer::{self, quote};
use std::collections::BTreeMap;

/// Mapping from alias name to the command text it stands for.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Remove an alias, returning its previous value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// All aliases, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite the first word of a raw line if it is an alias.
    ///
    /// The rest of the line is kept byte-for-byte, so quoting and pipes in the
    /// arguments survive. Returns `None` when no alias applies.
    pub fn expand_line(&self, line: &str) -> ShellResult<Option<String>> {
        let words = lexer::split_words(line)?;
        let Some(first) = words.first() else {
            return Ok(None);
        };
        let Some(value) = self.get(&first.text) else {
            return Ok(None);
        };
        tracing::debug!(alias = %first.text, %value, "expanding alias");
        let rest = line[first.span.end..].trim_start();
        if rest.is_empty() {
            Ok(Some(value.to_string()))
        } else {
            Ok(Some(format!("{value} {rest}")))
        }
    }
}

/// Resolve the command name of an already tokenized line against `aliases`.
///
/// Tokens are returned unchanged when the first one is not an alias.
pub fn resolve_aliases(tokens: Vec<String>, aliases: &AliasTable) -> ShellResult<Vec<String>> {
    let Some(value) = tokens.first().and_then(|name| aliases.get(name)) else {
        return Ok(tokens);
    };
    let mut line = value.to_string();
    for arg in &tokens[1..] {
        line.push(' ');
        line.push_str(&quote(arg));
    }
    lexer::tokenize(&line)
}
