// パス: src/dsl/mod.rs
// 役割: CST を型付きの値へ変換する文法コンビネータ（Matcher）を定義する
// 意図: 文法規則をデータとして宣言し、照合エンジンと値の構築を分離する
// 関連ファイル: src/dsl/engine.rs, src/parser/mod.rs, src/cst.rs
//! 文法 DSL
//!
//! - `Matcher` は CST の兄弟列の一部を消費する方法を代数的に記述する。
//! - 規則は名前付きで `Grammar` に登録し、`ref_` で相互参照する。
//! - 照合結果の値は `GrammarValue` を実装した任意の型で受け取る。
//! - 照合中に各位置の分類（キーワード・宣言・参照など）をメタデータとして記録する。

mod engine;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use crate::ast::Src;
use crate::cst::{Cst, ListKind, Loc, TextSpan};

use engine::Engine;

/// CST 位置の分類。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetaKind {
    Kwd,
    Punct,
    Decl,
    Ref,
    Bop,
    Attribute,
    FnArgs,
    Unparsed,
}

impl fmt::Display for MetaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MetaKind::Kwd => "kwd",
            MetaKind::Punct => "punct",
            MetaKind::Decl => "decl",
            MetaKind::Ref => "ref",
            MetaKind::Bop => "bop",
            MetaKind::Attribute => "attribute",
            MetaKind::FnArgs => "fn-args",
            MetaKind::Unparsed => "unparsed",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Meta {
    pub kind: MetaKind,
}

/// 位置ごとのメタデータ。
pub type Metadata = BTreeMap<Loc, Meta>;

/// `id` ノードの中身。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IdTok {
    pub text: String,
    pub loc: Loc,
}

/// 照合結果として組み立てられる値。
///
/// 各プリミティブ Matcher はここのコンストラクタで値を生成する。
pub trait GrammarValue: Clone + fmt::Debug {
    fn from_id(id: IdTok) -> Self;
    fn from_number(value: i64, loc: Loc) -> Self;
    fn from_node(loc: Loc) -> Self;
    fn from_many(items: Vec<Self>) -> Self;
    fn from_text(spans: Vec<TextSpan<Self>>, loc: Loc) -> Self;
    fn none() -> Self;
}

/// `tx` の変換関数。`None` を返すと照合失敗として扱う。
pub type Build<V> = fn(&mut Bindings<V>, Src) -> Option<V>;

/// `tx` 内で `group`/`ref_` が束縛した値。
#[derive(Debug)]
pub struct Bindings<V> {
    entries: Vec<(&'static str, V)>,
}

impl<V> Bindings<V> {
    pub(crate) fn new(entries: Vec<(&'static str, V)>) -> Self {
        Self { entries }
    }

    /// 最後に束縛された `name` の値を取り出す。
    pub fn take(&mut self, name: &str) -> Option<V> {
        let idx = self.entries.iter().rposition(|(n, _)| *n == name)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// `list` が受け付ける種別。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListMatch {
    Exact(ListKind),
    /// round / square / curly のいずれか
    Plain,
}

impl ListMatch {
    pub fn accepts(self, kind: ListKind) -> bool {
        match self {
            ListMatch::Exact(k) => k == kind,
            ListMatch::Plain => kind.is_plain(),
        }
    }
}

/// CST の兄弟列を消費する照合器。
pub enum Matcher<V> {
    Any,
    Kwd {
        text: &'static str,
        kind: MetaKind,
    },
    Id {
        kind: Option<MetaKind>,
    },
    Number,
    Text(Box<Matcher<V>>),
    List {
        kind: ListMatch,
        inner: Box<Matcher<V>>,
        meta: Option<MetaKind>,
    },
    Table {
        kind: ListKind,
        row: Box<Matcher<V>>,
    },
    Seq(Vec<Matcher<V>>),
    Or(Vec<Matcher<V>>),
    Star(Box<Matcher<V>>),
    Opt(Box<Matcher<V>>),
    Group {
        name: &'static str,
        inner: Box<Matcher<V>>,
    },
    Ref {
        rule: &'static str,
        name: Option<&'static str>,
    },
    Tx {
        inner: Box<Matcher<V>>,
        build: Build<V>,
    },
}

impl<V> fmt::Debug for Matcher<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Any => f.write_str("any"),
            Matcher::Kwd { text, .. } => write!(f, "kwd({text:?})"),
            Matcher::Id { .. } => f.write_str("id"),
            Matcher::Number => f.write_str("number"),
            Matcher::Text(inner) => write!(f, "text({inner:?})"),
            Matcher::List { kind, inner, .. } => write!(f, "list({kind:?}, {inner:?})"),
            Matcher::Table { kind, row } => write!(f, "table({kind}, {row:?})"),
            Matcher::Seq(items) => write!(f, "seq{items:?}"),
            Matcher::Or(items) => write!(f, "or{items:?}"),
            Matcher::Star(inner) => write!(f, "star({inner:?})"),
            Matcher::Opt(inner) => write!(f, "opt({inner:?})"),
            Matcher::Group { name, inner } => write!(f, "group({name:?}, {inner:?})"),
            Matcher::Ref { rule, .. } => write!(f, "ref({rule:?})"),
            Matcher::Tx { inner, .. } => write!(f, "tx({inner:?})"),
        }
    }
}

pub fn any<V>() -> Matcher<V> {
    Matcher::Any
}

/// 既定の分類 `kwd` でキーワードに一致する。
pub fn kwd<V>(text: &'static str) -> Matcher<V> {
    Matcher::Kwd {
        text,
        kind: MetaKind::Kwd,
    }
}

pub fn kwd_as<V>(text: &'static str, kind: MetaKind) -> Matcher<V> {
    Matcher::Kwd { text, kind }
}

/// キーワード以外の任意の `id`。
pub fn id<V>(kind: Option<MetaKind>) -> Matcher<V> {
    Matcher::Id { kind }
}

pub fn number<V>() -> Matcher<V> {
    Matcher::Number
}

pub fn text<V>(inner: Matcher<V>) -> Matcher<V> {
    Matcher::Text(Box::new(inner))
}

pub fn list<V>(kind: ListKind, inner: Matcher<V>) -> Matcher<V> {
    Matcher::List {
        kind: ListMatch::Exact(kind),
        inner: Box::new(inner),
        meta: None,
    }
}

/// 括弧の種類を問わないリスト。
pub fn plain_list<V>(inner: Matcher<V>) -> Matcher<V> {
    Matcher::List {
        kind: ListMatch::Plain,
        inner: Box::new(inner),
        meta: None,
    }
}

/// 一致したリスト自体の位置にメタデータを付けるリスト。
pub fn list_as<V>(kind: ListKind, inner: Matcher<V>, meta: MetaKind) -> Matcher<V> {
    Matcher::List {
        kind: ListMatch::Exact(kind),
        inner: Box::new(inner),
        meta: Some(meta),
    }
}

pub fn table<V>(kind: ListKind, row: Matcher<V>) -> Matcher<V> {
    Matcher::Table {
        kind,
        row: Box::new(row),
    }
}

pub fn seq<V>(items: Vec<Matcher<V>>) -> Matcher<V> {
    Matcher::Seq(items)
}

pub fn or<V>(items: Vec<Matcher<V>>) -> Matcher<V> {
    Matcher::Or(items)
}

pub fn star<V>(inner: Matcher<V>) -> Matcher<V> {
    Matcher::Star(Box::new(inner))
}

pub fn opt<V>(inner: Matcher<V>) -> Matcher<V> {
    Matcher::Opt(Box::new(inner))
}

pub fn group<V>(name: &'static str, inner: Matcher<V>) -> Matcher<V> {
    Matcher::Group {
        name,
        inner: Box::new(inner),
    }
}

/// 名前付き規則を呼び出す。`name` を与えると結果を束縛する。
pub fn ref_<V>(rule: &'static str, name: Option<&'static str>) -> Matcher<V> {
    Matcher::Ref { rule, name }
}

pub fn tx<V>(inner: Matcher<V>, build: Build<V>) -> Matcher<V> {
    Matcher::Tx {
        inner: Box::new(inner),
        build,
    }
}

/// 照合する CST の入れ子の既定の上限（段数）。
///
/// 照合エンジンは入れ子 1 段につき十数フレーム再帰する。
/// 2 MiB スタックのデバッグビルドでも収まる段数にしてある。
pub const DEFAULT_MAX_NESTING: usize = 20;

/// 入れ子の上限を超えた CST。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Nesting {
    /// 最も深い位置
    pub loc: Loc,
    pub depth: usize,
    pub limit: usize,
}

/// 照合の結果。`value` が `None` なら失敗。
#[derive(Debug)]
pub struct ParseOutcome<V> {
    pub value: Option<V>,
    pub metadata: Metadata,
    /// 失敗時に最後に検出された未消費ノード
    pub unparsed: Vec<Loc>,
    /// 入れ子が深すぎて照合しなかった場合の深さ
    pub too_deep: Option<Nesting>,
}

/// 名前付き規則とキーワード集合の組。
pub struct Grammar<V> {
    rules: HashMap<&'static str, Matcher<V>>,
    kwds: Vec<&'static str>,
    max_nesting: usize,
}

impl<V: GrammarValue> Grammar<V> {
    pub fn new(kwds: &[&'static str]) -> Self {
        Self {
            rules: HashMap::new(),
            kwds: kwds.to_vec(),
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }

    /// 照合を受け付ける入れ子の段数を変える。
    pub fn with_max_nesting(mut self, limit: usize) -> Self {
        self.max_nesting = limit;
        self
    }

    pub fn max_nesting(&self) -> usize {
        self.max_nesting
    }

    pub fn rule(mut self, name: &'static str, matcher: Matcher<V>) -> Self {
        self.rules.insert(name, matcher);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Matcher<V>> {
        self.rules.get(name)
    }

    pub fn is_kwd(&self, text: &str) -> bool {
        self.kwds.iter().any(|k| *k == text)
    }

    /// `root` ノード 1 つを規則 `rule` で照合する。
    ///
    /// 入れ子が `max_nesting` 段を超える CST は照合せず、`too_deep` に深さを入れて返す。
    pub fn parse(&self, cst: &Cst, rule: &'static str, root: Loc) -> ParseOutcome<V> {
        let (depth, loc) = cst.nesting(root);
        if depth > self.max_nesting {
            log::debug!("root {root} nests {depth} levels (limit {})", self.max_nesting);
            let mut metadata = Metadata::new();
            metadata.insert(
                root,
                Meta {
                    kind: MetaKind::Unparsed,
                },
            );
            return ParseOutcome {
                value: None,
                metadata,
                unparsed: Vec::new(),
                too_deep: Some(Nesting {
                    loc,
                    depth,
                    limit: self.max_nesting,
                }),
            };
        }
        let mut engine = Engine::new(self, cst);
        let value = match self.get(rule) {
            Some(matcher) => engine.run(matcher, root),
            None => {
                log::warn!("unknown grammar rule {rule}");
                None
            }
        };
        let (mut metadata, unparsed) = engine.finish();
        if value.is_none() {
            log::debug!("rule {rule} did not match root {root}");
            if unparsed.is_empty() {
                metadata.insert(
                    root,
                    Meta {
                        kind: MetaKind::Unparsed,
                    },
                );
            } else {
                for loc in &unparsed {
                    metadata.insert(
                        *loc,
                        Meta {
                            kind: MetaKind::Unparsed,
                        },
                    );
                }
            }
        }
        ParseOutcome {
            value,
            metadata,
            unparsed,
            too_deep: None,
        }
    }
}
