// パス: src/parser/mod.rs
// 役割: 文法 DSL で記述した JS 風言語の規則から AST を構築するエントリポイント
// 意図: CST のルートを 1 文として照合し、メタデータと併せて型推論へ渡す
// 関連ファイル: src/parser/stmt.rs, src/parser/expr.rs, src/parser/pat.rs, src/dsl/mod.rs
//! 構文解析モジュール
//!
//! - 文法は `stmt`/`expr`/`pat` の各規則群から成り、一度だけ構築して共有する。
//! - 二項演算子の優先順位は `INFIX_LEVELS` の表で与える（低い順）。
//! - 照合に失敗した位置は `unparsed` としてメタデータに残る。

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::ast::{Case, Expr, Pat, Src, Stmt};
use crate::cst::{Cst, Loc, TextSpan};
use crate::dsl::{Grammar, GrammarValue, IdTok, MetaKind, Metadata, Nesting};
use crate::errors::ParseError;

mod expr;
mod pat;
mod stmt;

/// `id` 規則が変数名として受け付けない語。
pub const KWDS: &[&str] = &[
    "for", "return", "new", "await", "throw", "if", "case", "else", "let", "const", "=", "..",
    ".", "fn", "switch",
];

/// 二項演算子として扱う語。
pub const BINOPS: &[&str] = &[
    "<", ">", "<=", ">=", "!=", "==", "+", "-", "*", "/", "^", "%", "=", "+=", "-=", "|=", "/=",
    "*=",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Assoc {
    Left,
    Right,
}

pub(super) struct InfixSpec {
    pub ops: &'static [&'static str],
    pub assoc: Assoc,
}

pub(super) const INFIX_LEVELS: &[InfixSpec] = &[
    InfixSpec {
        ops: &["=", "+=", "-=", "|=", "/=", "*="],
        assoc: Assoc::Right,
    },
    InfixSpec {
        ops: &["<", ">", "<=", ">=", "!=", "=="],
        assoc: Assoc::Left,
    },
    InfixSpec {
        ops: &["+", "-"],
        assoc: Assoc::Left,
    },
    InfixSpec {
        ops: &["*", "/", "%"],
        assoc: Assoc::Left,
    },
    InfixSpec {
        ops: &["^"],
        assoc: Assoc::Right,
    },
];

/// 演算子の優先レベル（0 が最も弱い）と結合性。
pub(super) fn infix_level(op: &str) -> Option<(usize, Assoc)> {
    INFIX_LEVELS
        .iter()
        .enumerate()
        .find(|(_, spec)| spec.ops.contains(&op))
        .map(|(level, spec)| (level, spec.assoc))
}

/// 添字・呼び出し・属性アクセスの後置要素。
#[derive(Clone, Debug, PartialEq)]
pub enum Suffix {
    Attribute(IdTok, Src),
    Index(Expr, Src),
    Call(Vec<Expr>, Src),
}

/// 文法照合で受け渡す値。
///
/// 照合エンジンの再帰の各フレームがこの値を抱えるため、AST は箱に入れて小さく保つ。
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    None,
    Node(Loc),
    Id(IdTok),
    Number(i64, Loc),
    Text(Vec<TextSpan<Value>>, Loc),
    Many(Vec<Value>),
    Expr(Box<Expr>),
    Stmt(Box<Stmt>),
    Pat(Box<Pat>),
    Suffix(Box<Suffix>),
    Case(Box<Case>),
}

impl GrammarValue for Value {
    fn from_id(id: IdTok) -> Self {
        Value::Id(id)
    }
    fn from_number(value: i64, loc: Loc) -> Self {
        Value::Number(value, loc)
    }
    fn from_node(loc: Loc) -> Self {
        Value::Node(loc)
    }
    fn from_many(items: Vec<Self>) -> Self {
        Value::Many(items)
    }
    fn from_text(spans: Vec<TextSpan<Self>>, loc: Loc) -> Self {
        Value::Text(spans, loc)
    }
    fn none() -> Self {
        Value::None
    }
}

impl Value {
    pub fn expr(expr: Expr) -> Self {
        Value::Expr(Box::new(expr))
    }

    pub fn stmt(stmt: Stmt) -> Self {
        Value::Stmt(Box::new(stmt))
    }

    pub fn pat(pat: Pat) -> Self {
        Value::Pat(Box::new(pat))
    }

    pub fn case(case: Case) -> Self {
        Value::Case(Box::new(case))
    }

    pub fn suffix(suffix: Suffix) -> Self {
        Value::Suffix(Box::new(suffix))
    }

    pub fn into_expr(self) -> Option<Expr> {
        match self {
            Value::Expr(e) => Some(*e),
            _ => None,
        }
    }

    pub fn into_pat(self) -> Option<Pat> {
        match self {
            Value::Pat(p) => Some(*p),
            _ => None,
        }
    }

    pub fn into_id(self) -> Option<IdTok> {
        match self {
            Value::Id(id) => Some(id),
            _ => None,
        }
    }

    pub fn into_many(self) -> Option<Vec<Value>> {
        match self {
            Value::Many(items) => Some(items),
            _ => None,
        }
    }

    /// 文として取り出す。式は式文に包む。
    pub fn into_stmt(self) -> Option<Stmt> {
        match self {
            Value::Stmt(s) => Some(*s),
            Value::Expr(expr) => {
                let src = expr.src();
                Some(Stmt::Expr { expr: *expr, src })
            }
            _ => None,
        }
    }

    /// 式として取り出す。式以外の文は単一要素のブロックに包む。
    pub fn into_body(self) -> Option<Expr> {
        match self {
            Value::Expr(e) => Some(*e),
            Value::Stmt(stmt) => match *stmt {
                Stmt::Expr { expr, .. } => Some(expr),
                stmt => {
                    let src = stmt.src();
                    Some(Expr::Block {
                        stmts: vec![stmt],
                        src,
                    })
                }
            },
            _ => None,
        }
    }
}

/// 要素がすべて式である列を取り出す。
pub(super) fn many_exprs(value: Value) -> Option<Vec<Expr>> {
    value.into_many()?.into_iter().map(Value::into_expr).collect()
}

pub(super) fn many_pats(value: Value) -> Option<Vec<Pat>> {
    value.into_many()?.into_iter().map(Value::into_pat).collect()
}

fn build_grammar() -> Grammar<Value> {
    let grammar = Grammar::new(KWDS);
    let grammar = stmt::rules(grammar);
    let grammar = expr::rules(grammar);
    pat::rules(grammar)
}

/// JS 風言語の文法。
pub static GRAMMAR: Lazy<Grammar<Value>> = Lazy::new(build_grammar);

/// 照合結果。`result` が `None` なら照合に失敗している。
#[derive(Clone, Debug, Serialize)]
pub struct ParseResult {
    pub root: Loc,
    pub result: Option<Stmt>,
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub too_deep: Option<Nesting>,
}

impl ParseResult {
    /// `unparsed` に分類された位置の一覧。
    pub fn unparsed(&self) -> Vec<Loc> {
        self.metadata
            .iter()
            .filter(|(_, meta)| meta.kind == MetaKind::Unparsed)
            .map(|(loc, _)| *loc)
            .collect()
    }

    /// 未消費ノードが残っていない場合だけ文を返す。
    pub fn into_result(self) -> Result<(Stmt, Metadata), ParseError> {
        if let Some(Nesting { loc, depth, limit }) = self.too_deep {
            return Err(ParseError::TooDeep { loc, depth, limit });
        }
        let unparsed = self.unparsed();
        match self.result {
            Some(stmt) if unparsed.is_empty() => Ok((stmt, self.metadata)),
            None if unparsed.is_empty() || unparsed == [self.root] => {
                Err(ParseError::NoMatch { root: self.root })
            }
            _ => Err(ParseError::Unparsed { locs: unparsed }),
        }
    }
}

/// CST ノード `root` を 1 つの文として解析する。
pub fn parse(cst: &Cst, root: Loc) -> ParseResult {
    let outcome = GRAMMAR.parse(cst, "stmt", root);
    let result = outcome.value.and_then(Value::into_stmt);
    if result.is_none() {
        log::debug!("parse failed at root {root}: unparsed {:?}", outcome.unparsed);
    }
    ParseResult {
        root,
        result,
        metadata: outcome.metadata,
        too_deep: outcome.too_deep,
    }
}

/// 最初のルートを解析する。ルートが無ければ `EmptyInput`。
pub fn parse_first(cst: &Cst) -> Result<(Stmt, Metadata), ParseError> {
    let root = *cst.roots.first().ok_or(ParseError::EmptyInput)?;
    parse(cst, root).into_result()
}
