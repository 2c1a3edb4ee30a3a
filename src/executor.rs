//! コマンド実行: 1 行の解析からリダイレクト適用、ビルトイン処理、パイプライン起動まで。
//!
//! - [`run_line`]: 1 行を解析して実行する。`exit` が要求されたら [`Flow::Exit`] を返す
//! - [`run_pipeline`]: ステージ列を子プロセスとして起動し、全員の終了を待つ
//!
//! ## パイプラインの起動順序
//!
//! 全ステージを先に起動し（各ステージの stdin/stdout は起動時にパイプへ付け替える）、
//! その後で全員を待つ。ステージは同時に走るので、段間のデータ量がパイプバッファを
//! 超えても書き手が詰まることはない。
//!
//! 親側のパイプ端は起動直後に閉じる。読み手がいなくなった書き手は SIGPIPE で終わり、
//! 書き手がいなくなった読み手は EOF を受け取る。

use std::os::unix::io::{AsRawFd, OwnedFd};

use crate::builtins;
use crate::config::PROGRAM;
use crate::parser::{self, Command};
use crate::redirect;
use crate::shell::Session;
use crate::spawn;

/// 1 行を処理した後に REPL ループが取るべき動作。
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// 1 行を解析して実行する。
///
/// 空行や空のパイプラインは何もしない。リダイレクトはビルトインを含む全ステージの
/// 処理前に適用し、パイプライン完了後に戻す。
pub fn run_line(session: &mut Session, line: &str) -> Flow {
    let pipeline = parser::parse(line);
    if pipeline.is_empty() {
        return Flow::Continue;
    }
    log::debug!("pipeline: {:?}", pipeline);

    let _redirect = match redirect::apply(&pipeline.redirection, &session.saved_stdio) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}: {}", PROGRAM, e);
            session.last_status = e.exit_status();
            return Flow::Continue;
        }
    };

    let interception = builtins::intercept(session, pipeline.stages);
    if interception.handled_any {
        log::debug!("builtins handled, {} stage(s) left", interception.spawn.len());
    }
    if interception.exit {
        return Flow::Exit;
    }
    if interception.spawn.iter().all(Command::is_empty) {
        return Flow::Continue;
    }

    let was_raw = session.terminal.suspend();
    session.last_status = run_pipeline(&interception.spawn);
    session.terminal.resume(was_raw);
    Flow::Continue
}

/// ステージ列を起動して全員を待ち、最後に起動したステージの終了ステータスを返す。
///
/// 空のコマンドはスキップする。起動に失敗したステージはエラーを報告し、
/// 他のステージはそのまま続ける（前段の出力は読み手なしで閉じられる）。
pub fn run_pipeline(stages: &[Command]) -> i32 {
    let stages: Vec<&Command> = stages.iter().filter(|c| !c.is_empty()).collect();
    let n = stages.len();

    let mut children: Vec<libc::pid_t> = Vec::with_capacity(n);
    let mut status = 0;
    let mut prev_read: Option<OwnedFd> = None;

    for (i, cmd) in stages.iter().enumerate() {
        let (next_read, write) = if i + 1 < n {
            match spawn::pipe() {
                Ok((r, w)) => (Some(r), Some(w)),
                Err(e) => {
                    eprintln!("{}: {}", PROGRAM, e);
                    status = e.exit_status();
                    break;
                }
            }
        } else {
            (None, None)
        };

        match spawn::spawn(
            &cmd.args,
            prev_read.as_ref().map(|fd| fd.as_raw_fd()),
            write.as_ref().map(|fd| fd.as_raw_fd()),
        ) {
            Ok(pid) => {
                log::debug!("spawned {} as pid {}", cmd.args[0], pid);
                children.push(pid);
            }
            Err(e) => {
                eprintln!("{}: {}", PROGRAM, e);
                status = e.exit_status();
            }
        }

        // 親側の端を閉じ、次のステージに読み取り端を渡す
        drop(write);
        prev_read = next_read;
    }
    drop(prev_read);

    let last = children.last().copied();
    for pid in children {
        match spawn::wait(pid) {
            Ok(code) => {
                log::debug!("pid {} exited with {}", pid, code);
                if Some(pid) == last {
                    status = code;
                }
            }
            Err(e) => {
                eprintln!("{}: {}", PROGRAM, e);
                status = e.exit_status();
            }
        }
    }
    status
}
