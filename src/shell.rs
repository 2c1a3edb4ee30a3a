//! セッション状態。REPL ループ全体で共有される。
//!
//! カレントディレクトリはプロセスの状態をそのまま使い、
//! `cd -` 用の前回ディレクトリはここで明示的に保持して [`builtins`](crate::builtins) に渡す。

use std::path::PathBuf;

use crate::error::ShellError;
use crate::history::History;
use crate::redirect::SavedStdio;
use crate::terminal::Terminal;

pub struct Session {
    /// 入力済みの行。行エディタは読み取りのみ。
    pub history: History,
    /// `cd` で最後に離れたディレクトリ。`cd -` の移動先。起動時は未設定。
    pub prev_dir: Option<PathBuf>,
    /// 起動時の端末設定と raw モード状態。
    pub terminal: Terminal,
    /// 起動時に複製した stdin / stdout。リダイレクト後の復元に使う。
    pub saved_stdio: SavedStdio,
    /// 直前のパイプラインの終了ステータス。
    pub last_status: i32,
}

impl Session {
    pub fn new() -> Result<Self, ShellError> {
        Ok(Self {
            history: History::new(),
            prev_dir: None,
            terminal: Terminal::new(libc::STDIN_FILENO),
            saved_stdio: SavedStdio::capture()?,
            last_status: 0,
        })
    }
}
