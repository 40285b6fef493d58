/// In-memory record of the lines the interpreter has processed.
///
/// Lines are stored exactly as received, before substitution, so recalling one
/// re-runs its substitutions. The interactive loop drains entries it has not
/// seen yet into the line editor.
#[derive(Debug, Default, Clone)]
pub struct History {
    entries: Vec<String>,
    synced: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, line: &str) {
        let line = line.trim();
        if !line.is_empty() {
            self.entries.push(line.to_string());
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Entries recorded since the previous call.
    pub fn take_unsynced(&mut self) -> &[String] {
        let start = self.synced;
        self.synced = self.entries.len();
        &self.entries[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_not_recorded() {
        let mut history = History::new();
        history.record("  ");
        history.record(" ls -l ");
        assert_eq!(history.entries(), ["ls -l"]);
    }

    #[test]
    fn unsynced_entries_are_handed_out_once() {
        let mut history = History::new();
        history.record("one");
        history.record("two");
        assert_eq!(history.take_unsynced(), ["one", "two"]);
        assert!(history.take_unsynced().is_empty());
        history.record("three");
        assert_eq!(history.take_unsynced(), ["three"]);
    }
}
