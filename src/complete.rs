//! Tab 補完（ファイル名・ディレクトリ名）。
//!
//! バッファ末尾の未完成トークンを「ディレクトリ部」（最後の `/` まで）と
//! 「スタブ」（それ以降）に分け、ディレクトリ部をホーム展開して走査し、
//! スタブを接頭辞に持つエントリを候補として集める。
//!
//! ## 候補の適用
//!
//! - 候補 0 件 → バッファ変更なし
//! - 候補 1 件 → スタブを候補で置換（ディレクトリなら末尾 `/` 付き）
//! - 候補複数 → 候補一覧を表示し、スタブを最長共通接頭辞まで伸ばす
//!
//! ディレクトリ部はユーザーが入力した綴りのままバッファに残す（`~/` も `./` も展開しない）。
//! 表示と再描画は [`editor`](crate::editor) 側で行う。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::parser;

/// 補完結果。`line` は補完を適用した後のバッファ全体。
#[derive(Debug, PartialEq)]
pub enum Completion {
    /// 一致なし。バッファは変えない。
    NoMatch,
    /// 一意に決まった。
    Unique { line: String },
    /// 複数候補。`line` のスタブは最長共通接頭辞まで伸ばしてある。
    Ambiguous { candidates: Vec<String>, line: String },
}

/// バッファに対して補完を行う。
pub fn complete(buf: &str) -> Completion {
    // 末尾が空白なら補完対象のトークンがない
    if buf.is_empty() || buf.ends_with([' ', '\t']) {
        return Completion::NoMatch;
    }
    let tokens = parser::tokenize(buf);
    let Some((partial, earlier)) = tokens.split_last() else {
        return Completion::NoMatch;
    };

    let (dir_part, stub) = split_partial(partial);
    if stub.is_empty() {
        return Completion::NoMatch;
    }

    let dir = search_dir(dir_part);
    let candidates = match scan_dir(&dir, stub) {
        Ok(c) => c,
        Err(e) => {
            log::debug!("completion scan of {} failed: {}", dir.display(), e);
            return Completion::NoMatch;
        }
    };

    let mut line = earlier.join(" ");
    if !line.is_empty() {
        line.push(' ');
    }
    line.push_str(dir_part);

    match candidates.len() {
        0 => Completion::NoMatch,
        1 => {
            line.push_str(&candidates[0]);
            Completion::Unique { line }
        }
        _ => {
            line.push_str(longest_common_prefix(&candidates));
            Completion::Ambiguous { candidates, line }
        }
    }
}

/// 未完成トークンを (ディレクトリ部, スタブ) に分ける。ディレクトリ部は末尾の `/` を含む。
fn split_partial(partial: &str) -> (&str, &str) {
    match partial.rfind('/') {
        Some(slash) => partial.split_at(slash + 1),
        None => ("", partial),
    }
}

/// 走査するディレクトリ。空ならカレントディレクトリ、それ以外はホーム展開したパス。
fn search_dir(dir_part: &str) -> PathBuf {
    if dir_part.is_empty() {
        PathBuf::from(".")
    } else {
        PathBuf::from(parser::expand_home(dir_part).as_ref())
    }
}

/// `dir` 内で `prefix` をバイト単位・大文字小文字区別ありの接頭辞に持つエントリ名を返す。
///
/// ディレクトリには末尾 `/` を付加する。シンボリックリンクはリンク先を `stat` して判定し、
/// `stat` に失敗したら通常ファイルとして扱う。UTF-8 でない名前は候補にしない。
/// 結果はソート済み。
pub fn scan_dir(dir: &Path, prefix: &str) -> io::Result<Vec<String>> {
    let mut results = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !name.starts_with(prefix) {
            continue;
        }
        let is_dir = match entry.file_type() {
            Ok(t) if t.is_symlink() => fs::metadata(entry.path()).is_ok_and(|m| m.is_dir()),
            Ok(t) => t.is_dir(),
            Err(_) => false,
        };
        results.push(if is_dir { format!("{}/", name) } else { name });
    }
    results.sort();
    Ok(results)
}

/// 候補群の最長共通接頭辞を返す。
///
/// 先頭候補の文字を位置ごとに全候補と比較し、不一致か最短候補の長さで止める。
/// 候補が空なら空文字列。
pub fn longest_common_prefix(candidates: &[String]) -> &str {
    let Some((first, rest)) = candidates.split_first() else {
        return "";
    };
    let mut end = first.len();
    for (i, ch) in first.char_indices() {
        let same = rest
            .iter()
            .all(|c| c.get(i..).is_some_and(|tail| tail.starts_with(ch)));
        if !same {
            end = i;
            break;
        }
    }
    &first[..end]
}
