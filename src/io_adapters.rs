use std::io::{self, BufRead, Write};

/// The three streams a built-in talks to.
///
/// The interactive loop hands in the terminal; tests hand in a `Cursor` and
/// two `Vec<u8>` buffers and inspect them afterwards.
pub struct Streams<'a> {
    /// Answers to confirmation prompts (`rm`) are read from here.
    pub input: &'a mut dyn BufRead,
    pub out: &'a mut dyn Write,
    pub err: &'a mut dyn Write,
}

impl<'a> Streams<'a> {
    pub fn new(input: &'a mut dyn BufRead, out: &'a mut dyn Write, err: &'a mut dyn Write) -> Self {
        Self { input, out, err }
    }

    /// Ask a yes/no question on `out` and read the answer from `input`.
    ///
    /// Anything other than `y`/`Y` (including end of input) counts as "no".
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        write!(
            self.out,
            "{}{} [y/N]: {}",
            crate::style::YELLOW,
            question,
            crate::style::RESET
        )?;
        self.out.flush()?;
        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(answer.trim().eq_ignore_ascii_case("y"))
    }
}
