//! rawsh: raw モード行エディタ付きの小さな対話シェル
//!
//! REPLループ: プロンプト表示 → 行エディタで入力読み取り → 履歴に追加 → 解析・実行 → ループ
//!
//! 端末は起動時に raw モードにし、`exit`・EOF・通常終了のいずれでも元に戻す。
//! 診断ログは `RUST_LOG=rawsh=debug` で stderr に出る。

use rawsh::config::PROGRAM;
use rawsh::editor::{self, LineEditor};
use rawsh::executor::{self, Flow};
use rawsh::prompt;
use rawsh::shell::Session;

fn main() {
    env_logger::init();

    // シェル自体は SIGINT/SIGQUIT を無視する。
    // 子プロセスは posix_spawnattr の POSIX_SPAWN_SETSIGDEF で SIG_DFL に戻される。
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_IGN);
        libc::signal(libc::SIGQUIT, libc::SIG_IGN);
    }

    let mut session = match Session::new() {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}: {}", PROGRAM, e);
            std::process::exit(1);
        }
    };
    session.terminal.enable_raw();
    let mut editor = LineEditor::new();

    loop {
        let prompt = prompt::render();
        let Some(line) = editor.read_line(&prompt, &session.history) else {
            // EOF (Ctrl+D): 改行を出力して正常終了
            editor::write_all("\n");
            break;
        };

        session.history.add(&line);
        if executor::run_line(&mut session, &line) == Flow::Exit {
            break;
        }
    }

    session.terminal.restore();
    log::debug!("session ended, last status {}", session.last_status);
}
