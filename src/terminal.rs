//! 端末モード管理。
//!
//! 起動時に `tcgetattr` で元の termios を保存し、非カノニカル・エコーなしの
//! raw モードに切り替える。パイプライン実行中は子プロセスに通常の端末を渡すため
//! 一時的に元の設定へ戻し（[`Terminal::suspend`]）、終了後に raw へ戻す（[`Terminal::resume`]）。
//!
//! 端末の fd は起動時に close-on-exec で複製して保持する。リダイレクトで 0 番が
//! ファイルに付け替えられている間も、設定の変更は元の端末に対して行われる。
//!
//! 元の設定は `exit`、EOF、通常終了のいずれでも [`Terminal::restore`] で戻す。
//! 呼び忘れても Drop で復元される。
//!
//! | フラグ | 操作 | 理由 |
//! |--------|------|------|
//! | `c_lflag` | `ICANON\|ECHO` OFF | 1 バイトずつ読み取り、表示は行エディタが自前で行う |
//! | `VMIN`/`VTIME` | `1` / `0` | 最低 1 バイトで即座に返る |
//!
//! `ISIG` は残すので Ctrl-C は SIGINT になる（シェル自身は無視する）。
//! Ctrl-D は `ICANON` OFF により `0x04` のバイトとして届く。

use std::io;
use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};

use crate::spawn;

/// 端末設定の保存と raw モード切り替え。stdin が端末でなければ何もしない。
pub struct Terminal {
    /// 端末の複製 fd と起動時の termios。端末でなければ `None`。
    tty: Option<(OwnedFd, libc::termios)>,
    raw: bool,
}

impl Terminal {
    /// `fd` の現在の設定を保存する。端末でない場合は no-op の `Terminal` を返す。
    pub fn new(fd: RawFd) -> Self {
        let mut orig: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &mut orig) } != 0 {
            log::warn!(
                "terminal settings unavailable on fd {}: {}",
                fd,
                io::Error::last_os_error()
            );
            return Self {
                tty: None,
                raw: false,
            };
        }
        let tty = match spawn::dup_cloexec(fd) {
            Ok(tty) => Some((tty, orig)),
            Err(e) => {
                log::warn!("terminal: {}", e);
                None
            }
        };
        Self { tty, raw: false }
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    /// raw モードに切り替える。
    pub fn enable_raw(&mut self) {
        let Some((tty, orig)) = &self.tty else {
            return;
        };
        let mut raw = *orig;
        raw.c_lflag &= !(libc::ICANON | libc::ECHO);
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;
        if unsafe { libc::tcsetattr(tty.as_raw_fd(), libc::TCSANOW, &raw) } == 0 {
            self.raw = true;
        } else {
            log::warn!("tcsetattr: {}", io::Error::last_os_error());
        }
    }

    /// 起動時の設定に戻す。失敗したら raw のままとして扱う。
    pub fn restore(&mut self) {
        let Some((tty, orig)) = &self.tty else {
            return;
        };
        if unsafe { libc::tcsetattr(tty.as_raw_fd(), libc::TCSANOW, orig) } == 0 {
            self.raw = false;
        } else {
            log::warn!("tcsetattr: {}", io::Error::last_os_error());
        }
    }

    /// 子プロセス実行のため一時的に元の設定へ戻す。raw だったかを返す。
    pub fn suspend(&mut self) -> bool {
        let was_raw = self.raw;
        if was_raw {
            self.restore();
        }
        was_raw
    }

    /// [`suspend`](Self::suspend) 前に raw だったなら raw に戻す。
    pub fn resume(&mut self, was_raw: bool) {
        if was_raw {
            self.enable_raw();
        }
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.raw {
            self.restore();
        }
    }
}
