//! プロンプト生成: `<user>:<cwd>$ `。
//!
//! カレントディレクトリがホーム配下なら先頭を `~` に置換する。
//! ユーザー名は青、ディレクトリは緑で描画し、行頭から描き直す。
//! 行エディタはプロンプトの表示幅を再描画の基準カラムとして使う。

use std::ffi::CStr;
use std::path::Path;

use unicode_width::UnicodeWidthStr;

use crate::config::{CLEAR_LINE, COLOR_CWD, COLOR_RESET, COLOR_USER};
use crate::parser;

/// 描画済みプロンプト。
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    /// 端末に書き出す文字列（ANSI エスケープ込み）。
    pub text: String,
    /// 表示幅（エスケープシーケンスを除いた端末上のカラム数。全角文字は 2）。
    pub width: usize,
}

impl Prompt {
    /// 色なしのプロンプト。テストや非端末入力向け。
    pub fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            width: text.width(),
        }
    }
}

/// 現在のユーザー名とカレントディレクトリからプロンプトを作る。
pub fn render() -> Prompt {
    let user = format!("{}:", user_name());
    let cwd = match std::env::current_dir() {
        Ok(dir) => display_dir(&dir, parser::home_dir().as_deref()),
        Err(e) => {
            log::warn!("getcwd: {}", e);
            "?".to_string()
        }
    };
    let cwd = format!("{}$ ", cwd);

    let width = user.width() + cwd.width();
    let text = format!("{CLEAR_LINE}\x1b[G{COLOR_USER}{user}{COLOR_CWD}{cwd}{COLOR_RESET}");
    Prompt { text, width }
}

/// ホーム配下なら `~` に置き換えたディレクトリ表示。
fn display_dir(dir: &Path, home: Option<&str>) -> String {
    if let Some(rest) = home.and_then(|h| dir.strip_prefix(h).ok()) {
        if rest.as_os_str().is_empty() {
            return "~".to_string();
        }
        return format!("~/{}", rest.display());
    }
    dir.display().to_string()
}

/// 実ユーザー ID のログイン名。引けなければ `?`。
fn user_name() -> String {
    let pw = unsafe { libc::getpwuid(libc::getuid()) };
    if pw.is_null() {
        return "?".to_string();
    }
    let name = unsafe { CStr::from_ptr((*pw).pw_name) };
    name.to_string_lossy().into_owned()
}
