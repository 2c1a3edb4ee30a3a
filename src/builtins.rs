//! ビルトインコマンドの実装。
//!
//! シェル自身のプロセスで実行する必要があるコマンド（`cd`, `exit`）と、
//! ステージをプログラムで置き換える `exec` を扱う。
//! [`intercept`] がパイプラインの各ステージを順に見て、ビルトインはその場で処理し、
//! 残りを [`executor`](crate::executor) に渡すコマンド列として返す。

use std::env;
use std::path::{Path, PathBuf};

use crate::config::PROGRAM;
use crate::error::ShellError;
use crate::parser::{self, Command};
use crate::shell::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cd,
    Exit,
    Exec,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "cd" => Some(Self::Cd),
            "exit" => Some(Self::Exit),
            "exec" => Some(Self::Exec),
            _ => None,
        }
    }
}

/// [`intercept`] の結果。
#[derive(Debug, Default)]
pub struct Interception {
    /// いずれかのステージがビルトインだった。
    pub handled_any: bool,
    /// 引数なしの `exit` が実行された。残りのステージは処理していない。
    pub exit: bool,
    /// プロセスとして起動するステージ（パイプライン内の順序を保つ）。
    pub spawn: Vec<Command>,
}

/// 各ステージの先頭トークンを見てビルトインを実行する。
///
/// - `cd` / `exit` はこの場で処理し、起動対象から外す
/// - `exec prog args...` は `prog args...` に置き換えて同じ位置に残す
/// - それ以外はそのまま起動対象にする
///
/// ビルトインのエラーは報告するだけで、後続のステージは引き続き処理する。
pub fn intercept(session: &mut Session, stages: Vec<Command>) -> Interception {
    let mut result = Interception::default();

    for cmd in stages {
        let Some(builtin) = cmd.name().and_then(Builtin::lookup) else {
            result.spawn.push(cmd);
            continue;
        };
        result.handled_any = true;

        let outcome = match builtin {
            Builtin::Cd => builtin_cd(&mut session.prev_dir, &cmd.args[1..]),
            Builtin::Exit if cmd.args.len() == 1 => {
                result.exit = true;
                break;
            }
            Builtin::Exit => Err(ShellError::ExitTakesNoArguments),
            Builtin::Exec => builtin_exec(&cmd.args[1..]).map(|program| result.spawn.push(program)),
        };

        if let Err(e) = outcome {
            eprintln!("{}: {}", PROGRAM, e);
            session.last_status = e.exit_status();
        }
    }

    result
}

/// `cd [dir|-]`: カレントディレクトリを変更する。
///
/// 移動に成功したときだけ、移動前のディレクトリを `prev_dir` に記録する。
/// 引数なしはホームへ、`-` は `prev_dir` へ移動する。
fn builtin_cd(prev_dir: &mut Option<PathBuf>, args: &[String]) -> Result<(), ShellError> {
    let target = match args.first().map(String::as_str) {
        None => PathBuf::from(parser::home_dir().ok_or(ShellError::HomeUnset)?),
        Some("-") => prev_dir.clone().ok_or(ShellError::PreviousDirUnset)?,
        Some(path) => PathBuf::from(path),
    };

    let current = env::current_dir().ok();
    change_dir(&target)?;
    log::debug!("cd {} (from {:?})", target.display(), current);
    if current.is_some() {
        *prev_dir = current;
    }
    Ok(())
}

fn change_dir(path: &Path) -> Result<(), ShellError> {
    env::set_current_dir(path).map_err(|_| ShellError::NotADirectory(path.display().to_string()))
}

/// `exec prog [args...]`: ステージを `prog [args...]` に置き換える。
fn builtin_exec(args: &[String]) -> Result<Command, ShellError> {
    if args.is_empty() {
        return Err(ShellError::ExecMissingProgram);
    }
    Ok(Command::new(args.to_vec()))
}
