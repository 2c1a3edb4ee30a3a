//! 行エディタ: バイト単位の状態機械、バッファ操作、表示更新。
//!
//! 端末を raw モードにした状態（[`terminal`](crate::terminal)）で stdin から 1 バイトずつ読み、
//! 明示的な状態機械でエスケープシーケンスを解釈する。
//! `libc`（`read(2)`, `write(2)`）のみで実装。
//!
//! ## 状態遷移
//!
//! ```text
//!            0x1b            '['             'A' / 'B' / その他
//! Normal ─────────▶ EscapeStart ─────▶ EscapeBracket ─────────────────▶ Normal
//!   ▲                   │ '[' 以外
//!   └───────────────────┘
//! ```
//!
//! 履歴の遡り件数（`history_offset`）は状態とは別に保持する。0 は「現在の入力」。
//!
//! ## 表示更新
//!
//! 1 バイト処理するたびにバッファ全体を再描画する。`\r` で行頭に戻り、
//! プロンプト幅だけ右に移動してからバッファを書き、行末までクリアする。
//! 1 キー分の出力はまとめて 1 回の `write(2)` で書き出す。

use crate::complete::{self, Completion};
use crate::config::{CLEAR_SCREEN, CLEAR_TO_EOL, MAX_LINE_LEN};
use crate::history::History;
use crate::prompt::Prompt;

/// エスケープシーケンス解釈の状態。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditState {
    Normal,
    /// `ESC` を受け取った直後。
    EscapeStart,
    /// `ESC [` を受け取った直後。
    EscapeBracket,
}

/// 1 バイト処理した結果。
#[derive(Debug, PartialEq)]
pub enum Step {
    /// 入力継続。
    Pending,
    /// 改行で確定した行。
    Submit(String),
    /// 入力終端（`0x04` または `read` が 0 を返した）。
    Eof,
}

/// 行エディタ本体。
pub struct LineEditor {
    /// 入力中のテキスト。カーソルは常に末尾。
    buf: String,
    state: EditState,
    /// 履歴を何件遡っているか。0 = 現在の入力。
    history_offset: usize,
    /// 組み立て途中の UTF-8 マルチバイト文字。
    utf8_pending: Vec<u8>,
    /// 入力に使うファイルディスクリプタ（通常 `STDIN_FILENO`）。
    fd: i32,
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl LineEditor {
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            state: EditState::Normal,
            history_offset: 0,
            utf8_pending: Vec::new(),
            fd: libc::STDIN_FILENO,
        }
    }

    /// プロンプトを表示して 1 行読み取る。
    /// 改行 → `Some(line)`、入力終端 → `None`。
    pub fn read_line(&mut self, prompt: &Prompt, history: &History) -> Option<String> {
        self.reset();
        write_all(&prompt.text);

        loop {
            let byte = read_byte(self.fd)?;
            let mut out = String::new();
            let step = self.feed(byte, prompt, history, &mut out);
            write_all(&out);
            match step {
                Step::Pending => continue,
                Step::Submit(line) => return Some(line),
                Step::Eof => return None,
            }
        }
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.state = EditState::Normal;
        self.history_offset = 0;
        self.utf8_pending.clear();
    }

    /// 1 バイトを処理し、端末への出力を `out` に積む。
    pub fn feed(&mut self, byte: u8, prompt: &Prompt, history: &History, out: &mut String) -> Step {
        match self.state {
            EditState::EscapeStart => {
                self.state = if byte == b'[' {
                    EditState::EscapeBracket
                } else {
                    EditState::Normal
                };
                return Step::Pending;
            }
            EditState::EscapeBracket => {
                self.state = EditState::Normal;
                match byte {
                    b'A' => self.history_prev(history),
                    b'B' => self.history_next(history),
                    _ => return Step::Pending,
                }
                self.redraw(prompt, out);
                return Step::Pending;
            }
            EditState::Normal => {}
        }

        if byte < 0x80 {
            self.utf8_pending.clear();
        }
        match byte {
            b'\n' | b'\r' => {
                out.push('\n');
                return Step::Submit(std::mem::take(&mut self.buf));
            }
            0x04 => return Step::Eof,
            b'\t' => self.complete(prompt, out),
            0x1b => {
                self.state = EditState::EscapeStart;
                return Step::Pending;
            }
            0x0c => {
                out.push_str(CLEAR_SCREEN);
                out.push_str(&prompt.text);
            }
            0x7f | 0x08 => {
                self.buf.pop();
            }
            0x20..=0x7e => self.insert_char(byte as char),
            0x80..=0xff => self.push_utf8(byte),
            _ => return Step::Pending,
        }
        self.redraw(prompt, out);
        Step::Pending
    }

    // ── バッファ操作 ──────────────────────────────────────────────

    /// 末尾に 1 文字追加する。最大長を超える場合は無視。
    fn insert_char(&mut self, ch: char) {
        if self.buf.len() + ch.len_utf8() <= MAX_LINE_LEN {
            self.buf.push(ch);
        }
    }

    /// マルチバイト文字のバイトを溜め、1 文字そろったら追加する。
    fn push_utf8(&mut self, byte: u8) {
        self.utf8_pending.push(byte);
        match std::str::from_utf8(&self.utf8_pending) {
            Ok(s) => {
                if let Some(ch) = s.chars().next() {
                    self.insert_char(ch);
                }
                self.utf8_pending.clear();
            }
            // 不正な列 or 4 バイトを超えたら捨てる
            Err(e) if e.error_len().is_some() || self.utf8_pending.len() >= 4 => {
                self.utf8_pending.clear();
            }
            Err(_) => {}
        }
    }

    /// バッファを置き換える（最大長で文字境界に切り詰め）。
    fn set_buffer(&mut self, mut line: String) {
        if line.len() > MAX_LINE_LEN {
            let mut end = MAX_LINE_LEN;
            while !line.is_char_boundary(end) {
                end -= 1;
            }
            line.truncate(end);
        }
        self.buf = line;
    }

    // ── 履歴ナビゲーション ────────────────────────────────────────

    /// ↑: 一つ古いエントリへ。履歴の長さを超えては遡らない。
    fn history_prev(&mut self, history: &History) {
        if let Some(entry) = history.recall(self.history_offset + 1) {
            self.history_offset += 1;
            self.set_buffer(entry.to_string());
        }
    }

    /// ↓: 一つ新しいエントリへ。0 に戻ったらバッファを空にする。
    fn history_next(&mut self, history: &History) {
        if self.history_offset == 0 {
            return;
        }
        self.history_offset -= 1;
        let entry = history.recall(self.history_offset).unwrap_or_default();
        self.set_buffer(entry.to_string());
    }

    // ── Tab 補完 ──────────────────────────────────────────────────

    /// 補完を適用する。候補が複数なら一覧を現在行の下に出し、プロンプトを描き直す。
    fn complete(&mut self, prompt: &Prompt, out: &mut String) {
        match complete::complete(&self.buf) {
            Completion::NoMatch => {}
            Completion::Unique { line } => self.set_buffer(line),
            Completion::Ambiguous { candidates, line } => {
                out.push('\n');
                for candidate in &candidates {
                    out.push_str(candidate);
                    out.push(' ');
                }
                out.push('\n');
                out.push_str(&prompt.text);
                self.set_buffer(line);
            }
        }
    }

    // ── 表示更新 ──────────────────────────────────────────────────

    /// プロンプト幅のカラムからバッファ全体を描き直す。
    fn redraw(&self, prompt: &Prompt, out: &mut String) {
        out.push('\r');
        if prompt.width > 0 {
            out.push_str(&format!("\x1b[{}C", prompt.width));
        }
        out.push_str(&self.buf);
        out.push_str(CLEAR_TO_EOL);
    }
}

/// `libc::read` で 1 バイト読み取る。EOF またはエラー時は `None`。
fn read_byte(fd: i32) -> Option<u8> {
    let mut buf = [0u8; 1];
    loop {
        let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, 1) };
        match n {
            1 => return Some(buf[0]),
            0 => return None,
            _ if std::io::Error::last_os_error().kind() == std::io::ErrorKind::Interrupted => {
                continue
            }
            _ => return None,
        }
    }
}

/// libc::write で直接出力する（Rust の stdout バッファをバイパス）。
pub fn write_all(s: &str) {
    let bytes = s.as_bytes();
    let mut written = 0;
    while written < bytes.len() {
        let n = unsafe {
            libc::write(
                libc::STDOUT_FILENO,
                bytes[written..].as_ptr() as *const libc::c_void,
                bytes.len() - written,
            )
        };
        if n <= 0 {
            break;
        }
        written += n as usize;
    }
}

// ── Tests ─────────────────────────────────────────────────────────
