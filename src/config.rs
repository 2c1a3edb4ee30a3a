//! コンパイル時定数。
//!
//! 設定ファイルは持たない。実行時に参照する環境変数は `HOME`（ホーム解決）と
//! `RUST_LOG`（診断ログ）のみ。

/// エラーメッセージの接頭辞に使うプログラム名。
pub const PROGRAM: &str = "rawsh";

/// 1 行の最大バイト数。これを超える入力は無視される。
pub const MAX_LINE_LEN: usize = 1023;

/// パイプ区切りトークン。
pub const PIPE: &str = "|";
/// 入力リダイレクトトークン。
pub const REDIRECT_IN: &str = "<";
/// 出力リダイレクトトークン（切り詰め or 新規作成）。
pub const REDIRECT_OUT: &str = ">";

/// `~user` 展開で使う固定のホームディレクトリ基底。
pub const HOME_BASE: &str = "/home";

// ── ANSI エスケープシーケンス ────────────────────────────────────

pub const CLEAR_LINE: &str = "\x1b[2K";
pub const CLEAR_TO_EOL: &str = "\x1b[K";
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
pub const COLOR_RESET: &str = "\x1b[39m";
pub const COLOR_USER: &str = "\x1b[38;5;27m";
pub const COLOR_CWD: &str = "\x1b[38;5;40m";
