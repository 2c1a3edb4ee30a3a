//! トークナイザ + ホーム展開 + パイプラインビルダー。
//!
//! 入力行を空白で区切ってトークン列にし、各トークンの先頭 `~` を展開したうえで
//! リダイレクト（`<` / `>`）を抜き取り、`|` でステージに分割して [`Pipeline`] を作る。
//!
//! ## 対応構文
//!
//! - パイプライン: `cmd1 | cmd2 | cmd3`
//! - リダイレクト: `< file`, `> file`（パイプライン全体に 1 つずつ）
//! - チルダ展開: `~`, `~/path`, `~user`, `~user/path`
//!
//! クォートやエスケープは解釈しない。空白を含むトークンは表現できない。
//! 予約トークンは空白で区切られた完全一致のみ（`a|b` は 1 トークン）。

use std::borrow::Cow;
use std::ffi::CStr;

use crate::config::{HOME_BASE, PIPE, REDIRECT_IN, REDIRECT_OUT};

// ── AST ─────────────────────────────────────────────────────────────

/// 単一コマンド。`args[0]` がプログラム名またはビルトイン名。
#[derive(Debug, Default, PartialEq, Clone)]
pub struct Command {
    pub args: Vec<String>,
}

impl Command {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// 先頭トークン（プログラム名 / ビルトイン名）。
    pub fn name(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

/// パイプライン全体に適用されるリダイレクト指定。
///
/// `input` は先頭ステージの stdin、`output` は末尾ステージの stdout に効く。
#[derive(Debug, Default, PartialEq, Clone)]
pub struct Redirection {
    pub input: Option<String>,
    pub output: Option<String>,
}

impl Redirection {
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none()
    }
}

/// `|` で接続されたコマンド列とリダイレクト指定。
#[derive(Debug, Default, PartialEq, Clone)]
pub struct Pipeline {
    pub stages: Vec<Command>,
    pub redirection: Redirection,
}

impl Pipeline {
    /// トークンが 1 つもなかったパイプライン。何も実行しない。
    pub fn is_empty(&self) -> bool {
        self.stages.iter().all(Command::is_empty)
    }
}

// ── Tokenizer ───────────────────────────────────────────────────────

/// 空白（スペース・タブ）と改行文字の連続で分割する。空トークンは生じない。
pub fn tokenize(line: &str) -> Vec<String> {
    line.split(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r'))
        .filter(|tok| !tok.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Home expansion ──────────────────────────────────────────────────

/// 起動ユーザーのホームディレクトリ。
///
/// `$HOME` が設定されていて空でなければそれを、なければパスワードデータベース
/// （`getpwuid(getuid())`）のエントリを使う。どちらも得られなければ `None`。
pub fn home_dir() -> Option<String> {
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return Some(home);
        }
    }
    let pw = unsafe { libc::getpwuid(libc::getuid()) };
    if pw.is_null() {
        return None;
    }
    let dir = unsafe { CStr::from_ptr((*pw).pw_dir) };
    dir.to_str().ok().filter(|d| !d.is_empty()).map(str::to_string)
}

/// チルダ展開: `~` → ホーム, `~/path` → ホーム + `/path`, `~user` → `/home/user/`。
///
/// `~user` はパスワードデータベースを引かず、固定の `/home/<user>/` 規約で置換する。
/// ホームが決まらなければトークンをそのまま返す。
pub fn expand_home(token: &str) -> Cow<'_, str> {
    if !token.starts_with('~') {
        return Cow::Borrowed(token);
    }
    let rest_start = token[1..].find('/').map(|i| i + 1).unwrap_or(token.len());
    let user = &token[1..rest_start];
    let rest = &token[rest_start..];

    if user.is_empty() {
        match home_dir() {
            Some(home) => Cow::Owned(format!("{}{}", home, rest)),
            None => Cow::Borrowed(token),
        }
    } else {
        // 置換結果は `/` で終わるので、残りの先頭 `/` は重ねない
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        Cow::Owned(format!("{}/{}/{}", HOME_BASE, user, rest))
    }
}

// ── Pipeline builder ────────────────────────────────────────────────

/// トークン列から `<` / `>` とその直後のファイル名をペアで取り除く。
///
/// 直後のトークンは予約トークンでもファイル名として扱う。
/// 各種別とも最初の指定が有効で、2 つ目以降のペアは取り除いたうえで無視する。
/// 行末にあってファイル名のない演算子だけはそのまま残すので、
/// 取り除かれたトークン列に対して再度呼んでも何も変わらない。
pub fn extract_redirection(tokens: &mut Vec<String>) -> Redirection {
    let mut redirection = Redirection::default();
    let mut i = 0;
    while i + 1 < tokens.len() {
        let is_in = tokens[i] == REDIRECT_IN;
        let is_out = tokens[i] == REDIRECT_OUT;
        if !(is_in || is_out) {
            i += 1;
            continue;
        }

        let target = tokens.remove(i + 1);
        tokens.remove(i);
        let slot = if is_in {
            &mut redirection.input
        } else {
            &mut redirection.output
        };
        if slot.is_some() {
            log::warn!("ignoring extra redirection to {}", target);
        } else {
            *slot = Some(target);
        }
    }
    redirection
}

/// `|` ごとにステージを閉じ、次のステージを開く。
///
/// ステージ数は常に `|` の数 + 1。`a | | b` のように空のステージも生じうる
/// （実行時にスキップされる）。
pub fn split_stages(tokens: Vec<String>) -> Vec<Command> {
    let mut stages = vec![Command::default()];
    for token in tokens {
        if token == PIPE {
            stages.push(Command::default());
        } else if let Some(current) = stages.last_mut() {
            current.args.push(token);
        }
    }
    stages
}

/// トークン列からパイプラインを構築する（リダイレクト抽出 → ステージ分割）。
///
/// トークンが空なら空のパイプラインを返す。
pub fn build(mut tokens: Vec<String>) -> Pipeline {
    if tokens.is_empty() {
        return Pipeline::default();
    }
    let redirection = extract_redirection(&mut tokens);
    Pipeline {
        stages: split_stages(tokens),
        redirection,
    }
}

/// 1 行を解析する: 分割 → 各トークンのホーム展開 → パイプライン構築。
pub fn parse(line: &str) -> Pipeline {
    let tokens = tokenize(line)
        .into_iter()
        .map(|tok| match expand_home(&tok) {
            Cow::Borrowed(_) => tok,
            Cow::Owned(expanded) => expanded,
        })
        .collect();
    build(tokens)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn toks(s: &str) -> Vec<String> {
        tokenize(s)
    }

    fn stage_args(p: &Pipeline) -> Vec<Vec<&str>> {
        p.stages
            .iter()
            .map(|c| c.args.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn tokenize_simple() {
        assert_eq!(toks("ls -la /tmp"), vec!["ls", "-la", "/tmp"]);
    }

    #[test]
    fn tokenize_collapses_whitespace_runs() {
        assert_eq!(toks("  echo \t hello\r\n  world \n"), vec!["echo", "hello", "world"]);
    }

    #[test]
    fn tokenize_empty_and_blank() {
        assert!(toks("").is_empty());
        assert!(toks("   \t\n").is_empty());
    }

    #[test]
    fn tokenize_keeps_quotes_verbatim() {
        assert_eq!(toks("echo \"a b\""), vec!["echo", "\"a", "b\""]);
        assert_eq!(toks("a|b"), vec!["a|b"]);
    }

    #[test]
    #[serial]
    fn expand_home_bare_and_path() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(expand_home("~"), "/home/tester");
        assert_eq!(expand_home("~/src/x"), "/home/tester/src/x");
    }

    #[test]
    fn expand_home_named_user() {
        assert_eq!(expand_home("~alice"), "/home/alice/");
        assert_eq!(expand_home("~alice/docs"), "/home/alice/docs");
    }

    #[test]
    fn expand_home_leaves_other_tokens() {
        assert!(matches!(expand_home("a~b"), Cow::Borrowed("a~b")));
        assert!(matches!(expand_home("/tmp"), Cow::Borrowed("/tmp")));
    }

    #[test]
    #[serial]
    fn expand_home_falls_back_to_passwd_when_home_empty() {
        let saved = std::env::var("HOME").ok();
        std::env::set_var("HOME", "");
        let expanded = expand_home("~/x").into_owned();
        // passwd にエントリがあれば展開され、なければそのまま
        assert!(expanded == "~/x" || expanded.ends_with("/x"));
        assert!(!expanded.starts_with("/x"));
        match saved {
            Some(h) => std::env::set_var("HOME", h),
            None => std::env::remove_var("HOME"),
        }
    }

    #[test]
    fn single_stage_keeps_all_tokens() {
        let p = build(toks("grep -n foo bar.txt"));
        assert_eq!(stage_args(&p), vec![vec!["grep", "-n", "foo", "bar.txt"]]);
        assert!(p.redirection.is_empty());
    }

    #[test]
    fn k_pipes_make_k_plus_one_stages() {
        for k in 0..5 {
            let line = vec!["cmd"; k + 1].join(" | ");
            let p = build(toks(&line));
            assert_eq!(p.stages.len(), k + 1);
            assert!(p
                .stages
                .iter()
                .all(|c| c.args.iter().all(|a| a != PIPE)));
        }
    }

    #[test]
    fn three_stage_pipeline() {
        let p = build(toks("cat f | sort -r | head -1"));
        assert_eq!(
            stage_args(&p),
            vec![vec!["cat", "f"], vec!["sort", "-r"], vec!["head", "-1"]]
        );
    }

    #[test]
    fn empty_stage_between_pipes() {
        let p = build(toks("a | | b"));
        assert_eq!(p.stages.len(), 3);
        assert!(p.stages[1].is_empty());
    }

    #[test]
    fn empty_input_is_empty_pipeline() {
        let p = build(Vec::new());
        assert!(p.is_empty());
        assert!(p.stages.is_empty());
    }

    #[test]
    fn redirection_anywhere_is_removed_in_pairs() {
        let p = build(toks("< in.txt sort | uniq > out.txt"));
        assert_eq!(stage_args(&p), vec![vec!["sort"], vec!["uniq"]]);
        assert_eq!(p.redirection.input.as_deref(), Some("in.txt"));
        assert_eq!(p.redirection.output.as_deref(), Some("out.txt"));
    }

    #[test]
    fn trailing_redirection_without_target_is_left() {
        let mut t = toks("echo hi >");
        let r = extract_redirection(&mut t);
        assert!(r.is_empty());
        assert_eq!(t, vec!["echo", "hi", ">"]);
    }

    #[test]
    fn operator_takes_next_token_even_if_reserved() {
        let mut t = toks("cat < | wc");
        let r = extract_redirection(&mut t);
        assert_eq!(r.input.as_deref(), Some("|"));
        assert_eq!(t, vec!["cat", "wc"]);
    }

    #[test]
    fn stacked_operators_are_stable_after_one_pass() {
        let mut t = toks("> > f g");
        let first = extract_redirection(&mut t);
        assert_eq!(first.output.as_deref(), Some(">"));
        assert_eq!(t, vec!["f", "g"]);

        let second = extract_redirection(&mut t);
        assert!(second.is_empty());
        assert_eq!(t, vec!["f", "g"]);
    }

    #[test]
    fn first_redirection_of_each_kind_wins() {
        let mut t = toks("cmd > a > b < c");
        let r = extract_redirection(&mut t);
        assert_eq!(t, vec!["cmd"]);
        assert_eq!(r.output.as_deref(), Some("a"));
        assert_eq!(r.input.as_deref(), Some("c"));
    }

    #[test]
    fn extraction_is_idempotent() {
        for line in [
            "cmd > a > b < c",
            "sort < in | uniq",
            "echo x >",
            "a b c",
            "> > f g",
            "< > x > y <",
            "a < < <",
        ] {
            let mut t = toks(line);
            extract_redirection(&mut t);
            let once = t.clone();
            let second = extract_redirection(&mut t);
            assert!(second.is_empty(), "line: {line}");
            assert_eq!(t, once, "line: {line}");
        }
    }

    #[test]
    #[serial]
    fn parse_expands_home_per_token() {
        std::env::set_var("HOME", "/home/tester");
        let p = parse("ls ~/a ~bob | cat > ~/out");
        assert_eq!(
            stage_args(&p),
            vec![vec!["ls", "/home/tester/a", "/home/bob/"], vec!["cat"]]
        );
        assert_eq!(p.redirection.output.as_deref(), Some("/home/tester/out"));
    }
}
