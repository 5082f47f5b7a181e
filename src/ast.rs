// パス: src/ast.rs
// 役割: 式・文・パターンの抽象構文木と CST 範囲（Src）を定義する
// 意図: 文法照合の結果を型推論へそのまま渡せる中立的な表現にする
// 関連ファイル: src/parser/mod.rs, src/infer/mod.rs, src/cst.rs
//! 抽象構文木（AST）
//!
//! 設計ノート:
//! - 二項演算子・添字・属性アクセス・タプル・配列はすべて関数適用に脱糖済み。
//! - 各ノードは `Src` を持ち、推論結果を元の CST 範囲へ結び付ける。

use std::fmt;

use serde::Serialize;

use crate::cst::Loc;

/// CST 上の範囲。`right` が無ければ `left` 単独。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Src {
    pub left: Loc,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<Loc>,
}

impl Src {
    pub fn at(loc: Loc) -> Self {
        Self {
            left: loc,
            right: None,
        }
    }

    /// `self` の左端から `other` の右端までを覆う範囲。
    pub fn merge(self, other: Src) -> Self {
        let right = other.right.unwrap_or(other.left);
        Self {
            left: self.left,
            right: (right != self.left).then_some(right),
        }
    }
}

impl fmt::Display for Src {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.right {
            Some(right) => write!(f, "{}..{}", self.left, right),
            None => write!(f, "{}", self.left),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Prim {
    Int(i64),
    Bool(bool),
}

impl Prim {
    /// 対応する具象型の名前。
    pub fn type_name(&self) -> &'static str {
        match self {
            Prim::Int(_) => "int",
            Prim::Bool(_) => "bool",
        }
    }
}

// 式ノード
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Expr {
    Block {
        stmts: Vec<Stmt>,
        src: Src,
    },
    If {
        cond: Box<Expr>,
        yes: Box<Expr>,
        no: Option<Box<Expr>>,
        src: Src,
    },
    Match {
        target: Box<Expr>,
        cases: Vec<Case>,
        src: Src,
    },
    Prim {
        prim: Prim,
        src: Src,
    },
    Var {
        name: String,
        src: Src,
    },
    Str {
        value: String,
        embeds: Vec<Expr>,
        src: Src,
    },
    Lambda {
        args: Vec<Pat>,
        body: Box<Expr>,
        src: Src,
    },
    App {
        target: Box<Expr>,
        args: Vec<Expr>,
        src: Src,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Case {
    pub pat: Pat,
    pub body: Expr,
}

// 文ノード
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Stmt {
    For {
        init: Box<Stmt>,
        cond: Expr,
        update: Expr,
        body: Box<Expr>,
        src: Src,
    },
    Let {
        pat: Pat,
        init: Expr,
        src: Src,
    },
    Expr {
        expr: Expr,
        src: Src,
    },
    Return {
        value: Option<Expr>,
        src: Src,
    },
}

// パターンノード
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Pat {
    Any { src: Src },
    Var { name: String, src: Src },
    Con { name: String, args: Vec<Pat>, src: Src },
    Str { value: String, src: Src },
    Prim { prim: Prim, src: Src },
}

impl Expr {
    pub fn src(&self) -> Src {
        match self {
            Expr::Block { src, .. }
            | Expr::If { src, .. }
            | Expr::Match { src, .. }
            | Expr::Prim { src, .. }
            | Expr::Var { src, .. }
            | Expr::Str { src, .. }
            | Expr::Lambda { src, .. }
            | Expr::App { src, .. } => *src,
        }
    }

    pub fn var(name: impl Into<String>, src: Src) -> Self {
        Expr::Var {
            name: name.into(),
            src,
        }
    }

    /// `target(args…)` の適用ノード。
    pub fn app(target: Expr, args: Vec<Expr>, src: Src) -> Self {
        Expr::App {
            target: Box::new(target),
            args,
            src,
        }
    }

    pub fn is_lambda(&self) -> bool {
        matches!(self, Expr::Lambda { .. })
    }
}

impl Stmt {
    pub fn src(&self) -> Src {
        match self {
            Stmt::For { src, .. }
            | Stmt::Let { src, .. }
            | Stmt::Expr { src, .. }
            | Stmt::Return { src, .. } => *src,
        }
    }
}

impl Pat {
    pub fn src(&self) -> Src {
        match self {
            Pat::Any { src }
            | Pat::Var { src, .. }
            | Pat::Con { src, .. }
            | Pat::Str { src, .. }
            | Pat::Prim { src, .. } => *src,
        }
    }
}

fn join<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

impl fmt::Display for Prim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prim::Int(v) => write!(f, "{v}"),
            Prim::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Block { stmts, .. } => write!(f, "{{{}}}", join(stmts, "; ")),
            Expr::If { cond, yes, no, .. } => {
                write!(f, "if ({cond}) {yes}")?;
                if let Some(no) = no {
                    write!(f, " else {no}")?;
                }
                Ok(())
            }
            Expr::Match { target, cases, .. } => {
                let parts: Vec<String> = cases
                    .iter()
                    .map(|c| format!("{}: {}", c.pat, c.body))
                    .collect();
                write!(f, "switch ({target}) {{{}}}", parts.join("; "))
            }
            Expr::Prim { prim, .. } => write!(f, "{prim}"),
            Expr::Var { name, .. } => write!(f, "{name}"),
            Expr::Str { value, .. } => write!(f, "{value:?}"),
            Expr::Lambda { args, body, .. } => write!(f, "({}) => {body}", join(args, ", ")),
            Expr::App { target, args, .. } => write!(f, "{target}({})", join(args, ", ")),
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::For {
                init,
                cond,
                update,
                body,
                ..
            } => write!(f, "for ({init}; {cond}; {update}) {body}"),
            Stmt::Let { pat, init, .. } => write!(f, "let {pat} = {init}"),
            Stmt::Expr { expr, .. } => write!(f, "{expr}"),
            Stmt::Return { value: Some(v), .. } => write!(f, "return {v}"),
            Stmt::Return { value: None, .. } => f.write_str("return"),
        }
    }
}

impl fmt::Display for Pat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pat::Any { .. } => f.write_str("_"),
            Pat::Var { name, .. } => write!(f, "{name}"),
            Pat::Con { name, args, .. } if name == "," => write!(f, "({})", join(args, ", ")),
            Pat::Con { name, args, .. } if name == "null" && args.is_empty() => f.write_str("()"),
            Pat::Con { name, args, .. } => write!(f, "{name}({})", join(args, ", ")),
            Pat::Str { value, .. } => write!(f, "{value:?}"),
            Pat::Prim { prim, .. } => write!(f, "{prim}"),
        }
    }
}
