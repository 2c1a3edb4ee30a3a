//! rawsh ライブラリ: バイナリ・ベンチマーク・テストからモジュールを使うために公開する。
//!
//! バイナリ本体は `main.rs` の REPL ループ。
//!
//! ## モジュール構成
//!
//! | モジュール | 役割 |
//! |-----------|------|
//! | [`editor`] | 行エディタ（バイト単位の状態機械、↑↓ 履歴、Tab 補完、Ctrl-L、再描画） |
//! | [`history`] | コマンド履歴（メモリ内、連続重複排除） |
//! | [`complete`] | Tab 補完（ディレクトリ走査、接頭辞一致、最長共通接頭辞） |
//! | [`parser`] | トークナイザ、チルダ展開、リダイレクト抽出、パイプライン分割 |
//! | [`redirect`] | シェル自身の stdin/stdout へのリダイレクト適用と復元 |
//! | [`builtins`] | ビルトイン（`cd`, `exit`, `exec`） |
//! | [`executor`] | 1 行の実行、パイプライン起動（全ステージ起動 → 全員待機） |
//! | [`spawn`] | `posix_spawnp` ラッパー、close-on-exec パイプ、`waitpid` |
//! | [`shell`] | セッション状態（履歴、前回ディレクトリ、端末、保存済み stdio） |
//! | [`terminal`] | raw モードの切り替えと復元 |
//! | [`prompt`] | `<user>:<cwd>$ ` プロンプト |
//! | [`config`] | 予約トークン・最大行長・ANSI シーケンスなどの定数 |
//! | [`error`] | エラー型 [`ShellError`](error::ShellError) |

pub mod builtins;
pub mod complete;
pub mod config;
pub mod editor;
pub mod error;
pub mod executor;
pub mod history;
pub mod parser;
pub mod prompt;
pub mod redirect;
pub mod shell;
pub mod spawn;
pub mod terminal;
