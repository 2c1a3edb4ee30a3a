//! `posix_spawnp()` の安全な Rust ラッパーとパイプ生成。
//!
//! ## 構成
//!
//! | 型 / 関数 | 役割 |
//! |-----|------|
//! | [`SpawnAttr`] | `posix_spawnattr_t` の RAII ラッパー（シグナルのデフォルト復帰） |
//! | [`FileActions`] | `posix_spawn_file_actions_t` の RAII ラッパー（stdin/stdout の付け替え） |
//! | [`CStringVec`] | argv 用の NULL 終端ポインタ配列 |
//! | [`spawn`] | 上記を組み合わせて `posix_spawnp` を呼ぶ |
//! | [`pipe`] | close-on-exec 付きのパイプを [`OwnedFd`] の組で返す |
//! | [`dup_cloexec`] | close-on-exec 付きの fd 複製 |
//!
//! パイプの両端は close-on-exec なので、子プロセスに残るのは
//! `dup2` で 0/1 番に付け替えたものだけになる。

use std::ffi::CString;
use std::os::unix::io::{FromRawFd, OwnedFd, RawFd};

use crate::error::ShellError;

// ── SpawnAttr ─────────────────────────────────────────────────────

/// `posix_spawnattr_t` の RAII ラッパー。Drop で自動 destroy。
struct SpawnAttr {
    inner: libc::posix_spawnattr_t,
}

impl SpawnAttr {
    fn new() -> Self {
        unsafe {
            let mut attr: libc::posix_spawnattr_t = std::mem::zeroed();
            libc::posix_spawnattr_init(&mut attr);
            Self { inner: attr }
        }
    }

    /// シェルが無視している SIGINT / SIGQUIT を子では `SIG_DFL` に戻す。
    fn set_sigdefault(&mut self) {
        unsafe {
            let mut flags: libc::c_short = 0;
            libc::posix_spawnattr_getflags(&self.inner, &mut flags);
            flags |= libc::POSIX_SPAWN_SETSIGDEF as libc::c_short;
            libc::posix_spawnattr_setflags(&mut self.inner, flags);

            let mut sigset: libc::sigset_t = std::mem::zeroed();
            libc::sigemptyset(&mut sigset);
            libc::sigaddset(&mut sigset, libc::SIGINT);
            libc::sigaddset(&mut sigset, libc::SIGQUIT);
            libc::posix_spawnattr_setsigdefault(&mut self.inner, &sigset);
        }
    }

    fn as_ptr(&self) -> *const libc::posix_spawnattr_t {
        &self.inner
    }
}

impl Drop for SpawnAttr {
    fn drop(&mut self) {
        unsafe {
            libc::posix_spawnattr_destroy(&mut self.inner);
        }
    }
}

// ── FileActions ───────────────────────────────────────────────────

/// `posix_spawn_file_actions_t` の RAII ラッパー。Drop で自動 destroy。
struct FileActions {
    inner: libc::posix_spawn_file_actions_t,
}

impl FileActions {
    fn new() -> Self {
        unsafe {
            let mut actions: libc::posix_spawn_file_actions_t = std::mem::zeroed();
            libc::posix_spawn_file_actions_init(&mut actions);
            Self { inner: actions }
        }
    }

    /// `dup2(fd, newfd)` アクションを追加する。
    fn add_dup2(&mut self, fd: RawFd, newfd: RawFd) {
        unsafe {
            libc::posix_spawn_file_actions_adddup2(&mut self.inner, fd, newfd);
        }
    }

    fn as_ptr(&self) -> *const libc::posix_spawn_file_actions_t {
        &self.inner
    }
}

impl Drop for FileActions {
    fn drop(&mut self) {
        unsafe {
            libc::posix_spawn_file_actions_destroy(&mut self.inner);
        }
    }
}

// ── CStringVec ────────────────────────────────────────────────────

/// argv 用の CString ベクタ。NULL 終端のポインタ配列を構築する。
struct CStringVec {
    strings: Vec<CString>,
    ptrs: Vec<*mut libc::c_char>,
}

impl CStringVec {
    /// 引数に NUL バイトが含まれていればエラー。
    fn from_args(args: &[String]) -> Result<Self, ShellError> {
        let strings = args
            .iter()
            .map(|s| CString::new(s.as_str()).map_err(|_| ShellError::NulInArgument(s.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        let mut ptrs: Vec<*mut libc::c_char> = strings
            .iter()
            .map(|s| s.as_ptr() as *mut libc::c_char)
            .collect();
        ptrs.push(std::ptr::null_mut()); // NULL 終端
        Ok(Self { strings, ptrs })
    }

    fn as_ptr(&self) -> *const *mut libc::c_char {
        self.ptrs.as_ptr()
    }
}

// ── spawn / pipe ──────────────────────────────────────────────────

/// `posix_spawnp` で子プロセスを起動し、子 PID を返す。
///
/// - `args`: コマンドと引数（`args[0]` を PATH 検索する）。空であってはならない
/// - `stdin_fd`: stdin に付け替える fd（`None` なら継承）
/// - `stdout_fd`: stdout に付け替える fd（`None` なら継承）
pub fn spawn(
    args: &[String],
    stdin_fd: Option<RawFd>,
    stdout_fd: Option<RawFd>,
) -> Result<libc::pid_t, ShellError> {
    let argv = CStringVec::from_args(args)?;
    let program = argv.strings.first().ok_or_else(|| ShellError::Spawn {
        command: String::new(),
        errno: libc::ENOENT,
    })?;

    let mut attr = SpawnAttr::new();
    attr.set_sigdefault();

    let mut actions = FileActions::new();
    if let Some(fd) = stdin_fd {
        actions.add_dup2(fd, libc::STDIN_FILENO);
    }
    if let Some(fd) = stdout_fd {
        actions.add_dup2(fd, libc::STDOUT_FILENO);
    }

    // environ を継承する
    extern "C" {
        static environ: *const *mut libc::c_char;
    }

    let mut pid: libc::pid_t = 0;
    let ret = unsafe {
        libc::posix_spawnp(
            &mut pid,
            program.as_ptr(),
            actions.as_ptr(),
            attr.as_ptr(),
            argv.as_ptr(),
            environ as *const *mut libc::c_char,
        )
    };

    if ret != 0 {
        return Err(ShellError::Spawn {
            command: args[0].clone(),
            errno: ret,
        });
    }
    Ok(pid)
}

/// close-on-exec 付きのパイプを作る。戻り値は (読み取り端, 書き込み端)。
pub fn pipe() -> Result<(OwnedFd, OwnedFd), ShellError> {
    let mut fds = [-1 as RawFd; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(ShellError::last_os("pipe"));
    }
    let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    for fd in [fds[0], fds[1]] {
        if unsafe { libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) } != 0 {
            return Err(ShellError::last_os("fcntl"));
        }
    }
    Ok((read, write))
}

/// `fd` を close-on-exec 付きで複製する（3 番以上の空き番号）。
pub fn dup_cloexec(fd: RawFd) -> Result<OwnedFd, ShellError> {
    let new = unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, 3) };
    if new < 0 {
        return Err(ShellError::last_os("dup"));
    }
    Ok(unsafe { OwnedFd::from_raw_fd(new) })
}

/// 子プロセスの終了を待ち、終了ステータスを返す（シグナル終了は 128 + シグナル番号）。
pub fn wait(pid: libc::pid_t) -> Result<i32, ShellError> {
    let mut status = 0;
    loop {
        if unsafe { libc::waitpid(pid, &mut status, 0) } >= 0 {
            break;
        }
        let err = std::io::Error::last_os_error();
        if err.kind() != std::io::ErrorKind::Interrupted {
            return Err(ShellError::Os {
                op: "waitpid",
                source: err,
            });
        }
    }
    if libc::WIFEXITED(status) {
        Ok(libc::WEXITSTATUS(status))
    } else if libc::WIFSIGNALED(status) {
        Ok(128 + libc::WTERMSIG(status))
    } else {
        Ok(1)
    }
}
