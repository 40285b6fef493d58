//! ANSI colors and the one place user-facing errors get printed.

use std::fmt::Display;
use std::io::Write;

pub const RED: &str = "\x1b[91m";
pub const GREEN: &str = "\x1b[92m";
pub const YELLOW: &str = "\x1b[93m";
pub const BLUE: &str = "\x1b[94m";
pub const CYAN: &str = "\x1b[96m";
pub const RESET: &str = "\x1b[0m";

/// Wrap `text` in `color` and a reset.
pub fn paint(color: &str, text: impl Display) -> String {
    format!("{color}{text}{RESET}")
}

/// Print an error in red on `err`, tagged with the component that failed,
/// and mirror it to the log.
///
/// Write failures are ignored: there is nowhere left to report them.
pub fn report(err: &mut dyn Write, origin: &str, message: impl Display) {
    tracing::error!(origin, "{message}");
    let line = if origin.is_empty() {
        message.to_string()
    } else {
        format!("{origin}: {message}")
    };
    let _ = writeln!(err, "{}", paint(RED, line));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_prefixes_origin() {
        let mut buf = Vec::new();
        report(&mut buf, "cd", "No such directory: /nope");
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            format!("{RED}cd: No such directory: /nope{RESET}\n")
        );
    }

    #[test]
    fn report_without_origin_prints_message_only() {
        let mut buf = Vec::new();
        report(&mut buf, "", "Command not found: nope");
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            format!("{RED}Command not found: nope{RESET}\n")
        );
    }
}
