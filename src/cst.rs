// パス: src/cst.rs
// 役割: 字句解析が生成する具象構文木（CST）のノード表現を定義する
// 意図: 位置 ID（Loc）で全ノードを参照できるアリーナ形式に統一する
// 関連ファイル: src/lexer.rs, src/dsl/mod.rs, src/parser/mod.rs
//! 具象構文木（CST）
//!
//! - ノードはアリーナ（`Vec<Node>`）に格納され、`Loc` はそのインデックス。
//! - `Loc` は字句解析時に単調増加で払い出されるため、兄弟ノードが同じ値を持つことはない。
//! - 解析後の CST は読み取り専用で、パーサは共有参照で辿る。

use std::fmt;

use serde::Serialize;

/// CST ノードの位置 ID。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Loc(pub u32);

impl Loc {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// リストの種別。`Smooshed` は空白なしの隣接、`Spaced` は空白区切り。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Round,
    Square,
    Curly,
    Angle,
    Smooshed,
    Spaced,
}

impl ListKind {
    /// 括弧で囲まれる種類（round/square/curly）かどうか。
    pub fn is_plain(self) -> bool {
        matches!(self, ListKind::Round | ListKind::Square | ListKind::Curly)
    }

    /// 開き括弧から種別を得る。
    pub fn from_opener(ch: char) -> Option<ListKind> {
        match ch {
            '(' => Some(ListKind::Round),
            '[' => Some(ListKind::Square),
            '{' => Some(ListKind::Curly),
            _ => None,
        }
    }

    /// 閉じ括弧から種別を得る。
    pub fn from_closer(ch: char) -> Option<ListKind> {
        match ch {
            ')' => Some(ListKind::Round),
            ']' => Some(ListKind::Square),
            '}' => Some(ListKind::Curly),
            _ => None,
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ListKind::Round => "round",
            ListKind::Square => "square",
            ListKind::Curly => "curly",
            ListKind::Angle => "angle",
            ListKind::Smooshed => "smooshed",
            ListKind::Spaced => "spaced",
        };
        f.write_str(s)
    }
}

/// 文字列リテラルの断片。`Embed` は `${...}` で埋め込まれた式。
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TextSpan<T> {
    Text { text: String },
    Embed { item: T },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Id {
        text: String,
        loc: Loc,
    },
    Text {
        spans: Vec<TextSpan<Loc>>,
        loc: Loc,
    },
    List {
        kind: ListKind,
        children: Vec<Loc>,
        #[serde(rename = "forceMultiline")]
        force_multiline: bool,
        loc: Loc,
    },
    Table {
        kind: ListKind,
        rows: Vec<Vec<Loc>>,
        #[serde(rename = "forceMultiline")]
        force_multiline: bool,
        loc: Loc,
    },
}

impl Node {
    pub fn loc(&self) -> Loc {
        match self {
            Node::Id { loc, .. }
            | Node::Text { loc, .. }
            | Node::List { loc, .. }
            | Node::Table { loc, .. } => *loc,
        }
    }
}

/// ノードのバイト範囲（半開区間）。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// 字句解析結果。`roots` は暗黙のトップレベルリストの子。
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cst {
    pub nodes: Vec<Node>,
    pub roots: Vec<Loc>,
    pub spans: Vec<Span>,
}

impl Cst {
    pub fn node(&self, loc: Loc) -> Option<&Node> {
        self.nodes.get(loc.index())
    }

    pub fn span(&self, loc: Loc) -> Option<Span> {
        self.spans.get(loc.index()).copied()
    }

    /// 子を持つノードならその子一覧を返す（テーブルは行を平坦化）。
    pub fn children(&self, loc: Loc) -> Vec<Loc> {
        match self.node(loc) {
            Some(Node::List { children, .. }) => children.clone(),
            Some(Node::Table { rows, .. }) => rows.iter().flatten().copied().collect(),
            Some(Node::Text { spans, .. }) => spans
                .iter()
                .filter_map(|s| match s {
                    TextSpan::Embed { item } => Some(*item),
                    TextSpan::Text { .. } => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// `root` から最も深い子孫までの段数（`root` 自身を 1 段と数える）と、その子孫の位置。
    ///
    /// 文法照合は入れ子 1 段ごとに再帰するため、照合の前にこの値で深さを検査する。
    pub fn nesting(&self, root: Loc) -> (usize, Loc) {
        let mut deepest = (1, root);
        let mut stack = vec![(root, 1)];
        while let Some((loc, depth)) = stack.pop() {
            if depth > deepest.0 {
                deepest = (depth, loc);
            }
            stack.extend(self.children(loc).into_iter().map(|child| (child, depth + 1)));
        }
        deepest
    }

    /// 指定範囲のソース文字列を切り出す。
    pub fn source_of<'a>(&self, src: &'a str, loc: Loc) -> Option<&'a str> {
        let span = self.span(loc)?;
        src.get(span.start..span.end)
    }
}
