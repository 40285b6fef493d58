//! Lexical analysis (tokenization) of a command line.
//!
//! The rules follow conventional POSIX word splitting closely enough for an
//! interactive shell: single quotes are literal, double quotes keep whitespace
//! and honour a handful of backslash escapes, a backslash outside quotes
//! escapes the next character, and unquoted whitespace separates words.
//! Variable references are *not* expanded here; `$X` stays `$X`.

use crate::error::{ShellError, ShellResult};
use std::ops::Range;

/// A word produced by the lexer: its unquoted text and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    /// Text with quotes removed and escapes resolved.
    pub text: String,
    /// Byte range of the raw word (quotes included) in the input line.
    pub span: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
}

struct LexingFSM<'a> {
    line: &'a str,
    input: Vec<(usize, char)>,
    pos: usize,
    state: LexingState,
    buffer: String,
    word_start: usize,
    words: Vec<Word>,
}

impl<'a> LexingFSM<'a> {
    fn new(line: &'a str) -> Self {
        LexingFSM {
            line,
            input: line.char_indices().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
            word_start: 0,
            words: Vec::new(),
        }
    }

    fn make_words(mut self) -> ShellResult<Vec<Word>> {
        while let Some((idx, ch)) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(idx, ch)?,
                LexingState::ReadingWord => self.handle_word(idx, ch)?,
                LexingState::ReadingSingleQuote => self.handle_single_quote(ch),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch)?,
            }
        }

        match self.state {
            LexingState::ReadingSingleQuote => {
                Err(ShellError::Parse("no closing quotation (')".into()))
            }
            LexingState::ReadingDoubleQuote => {
                Err(ShellError::Parse("no closing quotation (\")".into()))
            }
            LexingState::ReadingWord => {
                self.finish_word(self.line.len());
                Ok(self.words)
            }
            LexingState::Start => Ok(self.words),
        }
    }

    fn read_char(&mut self) -> Option<(usize, char)> {
        let item = self.input.get(self.pos).copied();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).map(|&(_, c)| c)
    }

    fn handle_start(&mut self, idx: usize, ch: char) -> ShellResult<()> {
        if ch.is_whitespace() {
            return Ok(());
        }
        self.word_start = idx;
        self.state = LexingState::ReadingWord;
        self.handle_word(idx, ch)
    }

    fn handle_word(&mut self, idx: usize, ch: char) -> ShellResult<()> {
        match ch {
            c if c.is_whitespace() => {
                self.finish_word(idx);
                self.state = LexingState::Start;
            }
            '\'' => self.state = LexingState::ReadingSingleQuote,
            '"' => self.state = LexingState::ReadingDoubleQuote,
            '\\' => match self.read_char() {
                Some((_, escaped)) => self.buffer.push(escaped),
                None => return Err(ShellError::Parse("no escaped character".into())),
            },
            c => self.buffer.push(c),
        }
        Ok(())
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::ReadingWord,
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) -> ShellResult<()> {
        match ch {
            '"' => self.state = LexingState::ReadingWord,
            '\\' => match self.peek_char() {
                Some(next @ ('"' | '\\' | '$' | '`' | '\n')) => {
                    self.read_char();
                    self.buffer.push(next);
                }
                Some(_) => self.buffer.push('\\'),
                None => return Err(ShellError::Parse("no closing quotation (\")".into())),
            },
            c => self.buffer.push(c),
        }
        Ok(())
    }

    fn finish_word(&mut self, end: usize) {
        self.words.push(Word {
            text: std::mem::take(&mut self.buffer),
            span: self.word_start..end,
        });
    }
}

/// Split a line into words, keeping the byte span of each raw word.
pub fn split_words(line: &str) -> ShellResult<Vec<Word>> {
    LexingFSM::new(line).make_words()
}

/// Split a line into tokens with quoting removed.
///
/// ```
/// use custom_shell::lexer::tokenize;
/// assert_eq!(tokenize(r#"a "b c" d"#).unwrap(), ["a", "b c", "d"]);
/// ```
pub fn tokenize(line: &str) -> ShellResult<Vec<String>> {
    Ok(split_words(line)?.into_iter().map(|w| w.text).collect())
}

/// Split a line on every `|` that is neither quoted nor escaped.
///
/// Segments are returned raw (untrimmed, quotes intact) so each can be
/// tokenized on its own.
pub fn split_pipeline(line: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut state = LexingState::Start;
    let mut escaped = false;
    let mut start = 0;

    for (idx, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (state, ch) {
            (LexingState::ReadingSingleQuote, '\'') => state = LexingState::Start,
            (LexingState::ReadingSingleQuote, _) => {}
            (LexingState::ReadingDoubleQuote, '"') => state = LexingState::Start,
            (LexingState::ReadingDoubleQuote, '\\') => escaped = true,
            (LexingState::ReadingDoubleQuote, _) => {}
            (_, '\\') => escaped = true,
            (_, '\'') => state = LexingState::ReadingSingleQuote,
            (_, '"') => state = LexingState::ReadingDoubleQuote,
            (_, '|') => {
                segments.push(&line[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    segments.push(&line[start..]);
    segments
}

/// Remove a single trailing `&`, reporting whether one was present.
pub fn strip_background(line: &str) -> (&str, bool) {
    let trimmed = line.trim_end();
    match trimmed.strip_suffix('&') {
        Some(rest) if !rest.ends_with('\\') => (rest.trim_end(), true),
        _ => (trimmed, false),
    }
}

/// Render a token back into shell syntax so that `tokenize` yields it unchanged.
pub fn quote(word: &str) -> String {
    let safe = |c: char| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c);
    if word.is_empty() {
        "''".to_string()
    } else if word.chars().all(safe) {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r#"'"'"'"#))
    }
}
