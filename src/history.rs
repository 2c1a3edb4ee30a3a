//! コマンド履歴（メモリ内のみ、セッション終了で破棄）。
//!
//! 追記専用で挿入順を保つ。空行と、直前のエントリと同一の行は追加しない。
//! ナビゲーション位置（何件遡っているか）は [`LineEditor`](crate::editor::LineEditor) が持ち、
//! 履歴自体は読み取りにしか使われない。

/// 入力済みの行の列（古い順）。
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// エントリを追加する。空白のみの行・直前と同一の行はスキップし、`false` を返す。
    pub fn add(&mut self, line: &str) -> bool {
        if line.trim().is_empty() {
            return false;
        }
        if self.entries.last().is_some_and(|last| last == line) {
            return false;
        }
        self.entries.push(line.to_string());
        true
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// 末尾から `offset` 件遡ったエントリ。`offset == 1` が最新。
    /// `0` や履歴長を超える値は `None`。
    pub fn recall(&self, offset: usize) -> Option<&str> {
        if offset == 0 || offset > self.entries.len() {
            return None;
        }
        Some(&self.entries[self.entries.len() - offset])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_history(entries: &[&str]) -> History {
        let mut h = History::new();
        for e in entries {
            h.add(e);
        }
        h
    }

    #[test]
    fn add_skips_empty_and_duplicates() {
        let mut h = History::new();
        assert!(!h.add(""));
        assert!(!h.add("  \t"));
        assert!(h.entries().is_empty());

        assert!(h.add("echo hello"));
        assert!(!h.add("echo hello"));
        assert_eq!(h.entries().len(), 1);

        assert!(h.add("echo world"));
        assert!(h.add("echo hello")); // 直前でなければ再追加できる
        assert_eq!(h.entries(), ["echo hello", "echo world", "echo hello"]);
    }

    #[test]
    fn prefix_of_previous_is_not_a_duplicate() {
        let h = make_history(&["ls -la", "ls"]);
        assert_eq!(h.entries().len(), 2);
    }

    #[test]
    fn no_two_consecutive_entries_are_equal() {
        let h = make_history(&["a", "a", "b", "b", "b", "a", "c", "c"]);
        assert_eq!(h.entries(), ["a", "b", "a", "c"]);
        assert!(h.entries().windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn recall_by_offset() {
        let h = make_history(&["first", "second", "third"]);
        assert_eq!(h.recall(0), None);
        assert_eq!(h.recall(1), Some("third"));
        assert_eq!(h.recall(2), Some("second"));
        assert_eq!(h.recall(3), Some("first"));
        assert_eq!(h.recall(4), None);
    }
}
