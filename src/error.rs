//! シェル全体で共有するエラー型。
//!
//! ユーザーへの報告は呼び出し側で `rawsh: {error}` として stderr に出す。
//! いずれのエラーもセッションを終了させない（ステージ単位・行単位で中断するだけ）。

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    /// `cd -` を前回ディレクトリ未設定で呼んだ。
    #[error("cd: Previous Directory is not set")]
    PreviousDirUnset,

    /// `cd` の移動先が存在しない or ディレクトリではない。
    #[error("cd: {0} is not a file or directory")]
    NotADirectory(String),

    /// ホームディレクトリを解決できない。
    #[error("cd: home directory is not set")]
    HomeUnset,

    #[error("exit: Command takes no arguments")]
    ExitTakesNoArguments,

    #[error("exec: missing program name")]
    ExecMissingProgram,

    /// リダイレクト先ファイルを開けない。
    #[error("{path}: {source}")]
    Redirect {
        path: String,
        #[source]
        source: io::Error,
    },

    /// `posix_spawnp` の失敗。`errno` は spawn が返した値。
    #[error("{command}: {}", spawn_message(*.errno))]
    Spawn { command: String, errno: i32 },

    /// 引数に NUL バイトが含まれていて argv を作れない。
    #[error("{0}: argument contains a NUL byte")]
    NulInArgument(String),

    /// `pipe(2)` / `dup(2)` / `dup2(2)` / `getcwd(3)` などの OS エラー。
    #[error("{op}: {source}")]
    Os {
        op: &'static str,
        #[source]
        source: io::Error,
    },
}

fn spawn_message(errno: i32) -> &'static str {
    match errno {
        libc::ENOENT => "command not found",
        libc::EACCES => "permission denied",
        _ => "spawn failed",
    }
}

impl ShellError {
    /// 直前の `errno` から [`ShellError::Os`] を作る。
    pub fn last_os(op: &'static str) -> Self {
        Self::Os {
            op,
            source: io::Error::last_os_error(),
        }
    }

    /// エラーに対応する終了ステータスを返す。
    /// 127 = command not found, 126 = permission denied, 1 = その他。
    pub fn exit_status(&self) -> i32 {
        match self {
            Self::Spawn { errno, .. } if *errno == libc::ENOENT => 127,
            Self::Spawn { errno, .. } if *errno == libc::EACCES => 126,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_error_messages() {
        let e = ShellError::Spawn {
            command: "nope".to_string(),
            errno: libc::ENOENT,
        };
        assert_eq!(e.to_string(), "nope: command not found");
        assert_eq!(e.exit_status(), 127);

        let e = ShellError::Spawn {
            command: "secret".to_string(),
            errno: libc::EACCES,
        };
        assert_eq!(e.to_string(), "secret: permission denied");
        assert_eq!(e.exit_status(), 126);
    }

    #[test]
    fn cd_messages() {
        assert_eq!(
            ShellError::PreviousDirUnset.to_string(),
            "cd: Previous Directory is not set"
        );
        assert_eq!(
            ShellError::NotADirectory("nowhere".into()).to_string(),
            "cd: nowhere is not a file or directory"
        );
        assert_eq!(ShellError::PreviousDirUnset.exit_status(), 1);
    }
}
