// パス: src/errors.rs
// 役割: 字句解析・構文照合・型推論のエラー型と共通表示形式を定義する
// 意図: 失敗箇所をコード付きで報告し、呼び出し側が部分トレースと併せて扱えるようにする
// 関連ファイル: src/lexer.rs, src/parser/mod.rs, src/infer/mod.rs, src/pipeline.rs
//! エラー型の定義（共通フォーマット: \[CODE\] メッセージ @line:col / @pos）。
//!
//! - 各段階のエラーは `thiserror` で列挙型として定義し、安定したコードを `code()` で返す。
//! - 人間向けの整形は `ErrorInfo` に集約する（行・列・スニペット付き）。

use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::cst::{ListKind, Loc};
use crate::typesys::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub msg: String,
    pub pos: Option<usize>,      // バイトオフセット（任意）
    pub line: Option<usize>,     // 1-origin（任意）
    pub col: Option<usize>,      // 1-origin（任意）
    pub snippet: Option<String>, // エラー行のスニペット（任意）
}

impl ErrorInfo {
    pub fn new(code: &'static str, msg: impl Into<String>, pos: Option<usize>) -> Self {
        Self {
            code,
            msg: msg.into(),
            pos,
            line: None,
            col: None,
            snippet: None,
        }
    }
    pub fn at(
        code: &'static str,
        msg: impl Into<String>,
        pos: Option<usize>,
        line: Option<usize>,
        col: Option<usize>,
    ) -> Self {
        Self {
            code,
            msg: msg.into(),
            pos,
            line,
            col,
            snippet: None,
        }
    }
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // 1行目: ヘッダ
        match (self.line, self.col, self.pos) {
            (Some(l), Some(c), Some(p)) => write!(
                f,
                "[{}] {} @line={},col={} @pos={}",
                self.code, self.msg, l, c, p
            )?,
            (Some(l), Some(c), None) => {
                write!(f, "[{}] {} @line={},col={}", self.code, self.msg, l, c)?
            }
            (_, _, Some(p)) => write!(f, "[{}] {} @pos={}", self.code, self.msg, p)?,
            _ => write!(f, "[{}] {}", self.code, self.msg)?,
        }
        // 2行目以降: スニペット
        if let (Some(s), Some(c)) = (&self.snippet, self.col) {
            let caret = if c > 1 {
                " ".repeat(c - 1) + "^"
            } else {
                "^".to_string()
            };
            write!(f, "\n{}\n{}", s, caret)?;
        }
        Ok(())
    }
}

/// 字句解析（CST 構築）の失敗。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("対応しない閉じ括弧: {found} を読みましたが {} を閉じる必要があります", expected_text(.expected))]
    UnexpectedClose {
        expected: Option<ListKind>,
        found: ListKind,
        pos: usize,
    },
    #[error("{kind} リストが閉じられていません")]
    UnclosedList { kind: ListKind, pos: usize },
    #[error("文字列リテラルが閉じられていません")]
    UnterminatedText { pos: usize },
    #[error("文字列の埋め込み ${{}} が空です")]
    EmptyEmbed { pos: usize },
}

fn expected_text(expected: &Option<ListKind>) -> String {
    match expected {
        Some(kind) => kind.to_string(),
        None => "何も".to_string(),
    }
}

impl LexError {
    pub fn code(&self) -> &'static str {
        match self {
            LexError::UnexpectedClose { .. } => "LEX001",
            LexError::UnclosedList { .. } => "LEX002",
            LexError::UnterminatedText { .. } => "LEX003",
            LexError::EmptyEmbed { .. } => "LEX004",
        }
    }

    pub fn pos(&self) -> usize {
        match self {
            LexError::UnexpectedClose { pos, .. }
            | LexError::UnclosedList { pos, .. }
            | LexError::UnterminatedText { pos }
            | LexError::EmptyEmbed { pos } => *pos,
        }
    }
}

/// 文法照合の失敗。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("入力が空です")]
    EmptyInput,
    #[error("ルート {root} に一致する規則がありません")]
    NoMatch { root: Loc },
    #[error("解析されなかったノードがあります: {}", join_locs(.locs))]
    Unparsed { locs: Vec<Loc> },
    #[error("入れ子が深すぎます: {depth} 段 (上限 {limit} 段)")]
    TooDeep { loc: Loc, depth: usize, limit: usize },
}

fn join_locs(locs: &[Loc]) -> String {
    locs.iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ParseError {
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::EmptyInput => "PAR000",
            ParseError::NoMatch { .. } => "PAR001",
            ParseError::Unparsed { .. } => "PAR002",
            ParseError::TooDeep { .. } => "PAR003",
        }
    }

    /// 失敗を代表する CST 位置。
    pub fn loc(&self) -> Option<Loc> {
        match self {
            ParseError::EmptyInput => None,
            ParseError::NoMatch { root } => Some(*root),
            ParseError::Unparsed { locs } => locs.first().copied(),
            ParseError::TooDeep { loc, .. } => Some(*loc),
        }
    }
}

/// 型推論の失敗。いずれも検出時点で推論全体を中断する。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("未束縛変数: {0}")]
    UnboundVariable(String),
    #[error("型不一致: {0} vs {1}")]
    IncompatibleTypes(Type, Type),
    #[error("引数の数が異なります: {expected} vs {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("オカーズチェック失敗: {0} が {1} に出現します")]
    OccursCheck(String, Type),
    #[error("引数のないラムダは扱えません")]
    EmptyLambda,
    #[error("引数のない呼び出しは扱えません")]
    EmptyCall,
    #[error("未知のコンストラクタ: {0}")]
    UnknownConstructor(String),
    #[error("関数の外で return しています")]
    ReturnOutsideFunction,
    #[error("置換の上書きが発生しました: {0}")]
    SubstitutionOverwrite(String),
}

impl TypeError {
    pub fn code(&self) -> &'static str {
        match self {
            TypeError::IncompatibleTypes(..) => "TYPE001",
            TypeError::OccursCheck(..) => "TYPE002",
            TypeError::ArityMismatch { .. } => "TYPE003",
            TypeError::UnboundVariable(_) => "TYPE010",
            TypeError::UnknownConstructor(_) => "TYPE011",
            TypeError::EmptyLambda => "TYPE020",
            TypeError::EmptyCall => "TYPE021",
            TypeError::ReturnOutsideFunction => "TYPE030",
            TypeError::SubstitutionOverwrite(_) => "TYPE090",
        }
    }

    pub fn info(&self) -> ErrorInfo {
        ErrorInfo::new(self.code(), self.to_string(), None)
    }
}
