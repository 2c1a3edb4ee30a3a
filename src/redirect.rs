//! リダイレクトの適用と復元。
//!
//! `<` / `>` はパイプライン全体に対するもので、どのステージも起動する前に
//! シェル自身の stdin / stdout を `dup2` で付け替える。子プロセスはそれを継承するので、
//! 先頭ステージの入力と末尾ステージの出力（パイプでつながっていない側）がファイルになる。
//!
//! 元の fd はセッション開始時に一度だけ [`SavedStdio`] に複製しておき、
//! パイプライン完了後に [`RedirectGuard`] の Drop で書き戻す。

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};

use crate::error::ShellError;
use crate::parser::Redirection;
use crate::spawn;

/// 付け替え対象の fd 番号と、その起動時の複製（close-on-exec）。
struct SavedFd {
    target: RawFd,
    copy: OwnedFd,
}

impl SavedFd {
    fn capture(target: RawFd) -> Result<Self, ShellError> {
        Ok(Self {
            target,
            copy: spawn::dup_cloexec(target)?,
        })
    }
}

/// 起動時の stdin / stdout の複製。
pub struct SavedStdio {
    stdin: SavedFd,
    stdout: SavedFd,
}

impl SavedStdio {
    /// シェル自身の 0 番 / 1 番を保存する。
    pub fn capture() -> Result<Self, ShellError> {
        Self::capture_from(libc::STDIN_FILENO, libc::STDOUT_FILENO)
    }

    /// `input` / `output` を付け替え対象として保存する。
    pub fn capture_from(input: RawFd, output: RawFd) -> Result<Self, ShellError> {
        Ok(Self {
            stdin: SavedFd::capture(input)?,
            stdout: SavedFd::capture(output)?,
        })
    }
}

/// 適用中のリダイレクト。Drop で付け替えた fd だけを元に戻す。
#[derive(Debug)]
pub struct RedirectGuard {
    /// (付け替えた fd 番号, 戻す先の保存済み fd)
    restore: Vec<(RawFd, RawFd)>,
}

impl RedirectGuard {
    pub fn is_active(&self) -> bool {
        !self.restore.is_empty()
    }
}

impl Drop for RedirectGuard {
    fn drop(&mut self) {
        if self.restore.is_empty() {
            return;
        }
        let _ = io::stdout().flush();
        for &(target, saved) in &self.restore {
            if let Err(e) = dup2(saved, target) {
                log::warn!("failed to restore fd {}: {}", target, e);
            }
        }
        log::debug!("restored redirected stdio");
    }
}

/// リダイレクトをシェル自身の stdin / stdout に適用する。
///
/// 入力は読み取り専用、出力は書き込み・新規作成・切り詰め（0666 & ~umask）で開く。
/// どちらかのファイルが開けなければ何も付け替えずにエラーを返す。
pub fn apply(redirection: &Redirection, saved: &SavedStdio) -> Result<RedirectGuard, ShellError> {
    let input = match &redirection.input {
        Some(path) => Some(File::open(path).map_err(|source| ShellError::Redirect {
            path: path.clone(),
            source,
        })?),
        None => None,
    };
    let output = match &redirection.output {
        Some(path) => Some(
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)
                .map_err(|source| ShellError::Redirect {
                    path: path.clone(),
                    source,
                })?,
        ),
        None => None,
    };

    let mut guard = RedirectGuard {
        restore: Vec::new(),
    };
    if let Some(file) = input {
        dup2(file.as_raw_fd(), saved.stdin.target)?;
        guard
            .restore
            .push((saved.stdin.target, saved.stdin.copy.as_raw_fd()));
    }
    if let Some(file) = output {
        let _ = io::stdout().flush();
        dup2(file.as_raw_fd(), saved.stdout.target)?;
        guard
            .restore
            .push((saved.stdout.target, saved.stdout.copy.as_raw_fd()));
    }
    if guard.is_active() {
        log::debug!("applied redirection {:?}", redirection);
    }
    Ok(guard)
}

fn dup2(src: RawFd, dst: RawFd) -> Result<(), ShellError> {
    loop {
        if unsafe { libc::dup2(src, dst) } >= 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(ShellError::Os {
                op: "dup2",
                source: err,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom};

    /// シェルの stdin / stdout の代わりに付け替え対象にするファイル 2 つ。
    struct FakeStdio {
        input: File,
        output: File,
        saved: SavedStdio,
    }

    fn fake_stdio() -> FakeStdio {
        let input = tempfile::tempfile().unwrap();
        let output = tempfile::tempfile().unwrap();
        let saved = SavedStdio::capture_from(input.as_raw_fd(), output.as_raw_fd()).unwrap();
        FakeStdio {
            input,
            output,
            saved,
        }
    }

    fn write_fd(fd: RawFd, msg: &[u8]) {
        let n = unsafe { libc::write(fd, msg.as_ptr() as *const libc::c_void, msg.len()) };
        assert_eq!(n, msg.len() as isize);
    }

    fn read_fd(fd: RawFd) -> String {
        let mut buf = [0u8; 256];
        let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        assert!(n >= 0);
        String::from_utf8_lossy(&buf[..n as usize]).into_owned()
    }

    fn contents(file: &mut File) -> String {
        let mut out = String::new();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn empty_redirection_is_inactive() {
        let fake = fake_stdio();
        let guard = apply(&Redirection::default(), &fake.saved).unwrap();
        assert!(!guard.is_active());
    }

    #[test]
    fn missing_input_file_is_reported() {
        let fake = fake_stdio();
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.txt").display().to_string();
        let err = apply(
            &Redirection {
                input: Some(missing.clone()),
                output: None,
            },
            &fake.saved,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with(&missing));
    }

    #[test]
    fn unopenable_output_leaves_input_untouched() {
        let mut fake = fake_stdio();
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in.txt");
        std::fs::write(&input, "data").unwrap();

        let err = apply(
            &Redirection {
                input: Some(input.display().to_string()),
                output: Some(tmp.path().join("no/such/dir").display().to_string()),
            },
            &fake.saved,
        );
        assert!(err.is_err());
        // 入力側も付け替えられていない
        assert_eq!(read_fd(fake.input.as_raw_fd()), "");
        write_fd(fake.output.as_raw_fd(), b"still here");
        assert_eq!(contents(&mut fake.output), "still here");
    }

    #[test]
    fn output_redirection_truncates_and_restores() {
        let mut fake = fake_stdio();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.txt");
        std::fs::write(&path, "previous contents that are longer").unwrap();

        let redirection = Redirection {
            input: None,
            output: Some(path.display().to_string()),
        };
        {
            let guard = apply(&redirection, &fake.saved).unwrap();
            assert!(guard.is_active());
            write_fd(fake.output.as_raw_fd(), b"short\n");
        }
        write_fd(fake.output.as_raw_fd(), b"after\n");

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "short\n");
        assert_eq!(contents(&mut fake.output), "after\n");
    }

    #[test]
    fn input_redirection_reads_file_then_restores() {
        let fake = fake_stdio();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("in.txt");
        std::fs::write(&path, "from file").unwrap();

        let redirection = Redirection {
            input: Some(path.display().to_string()),
            output: None,
        };
        {
            let _guard = apply(&redirection, &fake.saved).unwrap();
            assert_eq!(read_fd(fake.input.as_raw_fd()), "from file");
        }
        // 元の（空の）入力に戻っている
        assert_eq!(read_fd(fake.input.as_raw_fd()), "");
    }
}
