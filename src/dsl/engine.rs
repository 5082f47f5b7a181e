// パス: src/dsl/engine.rs
// 役割: Matcher を CST の兄弟列に対して実行する照合エンジン
// 意図: 失敗した分岐の副作用（メタデータ・束縛）をジャーナルの巻き戻しで取り消す
// 関連ファイル: src/dsl/mod.rs, src/cst.rs
//! 照合エンジン
//!
//! - メタデータは追記専用のジャーナルに積み、失敗時は長さを巻き戻す。
//! - `tx` は自身の開始時点以降に積まれた束縛だけを受け取る。
//! - 未消費ノードの報告は、照合が最終的に失敗した経路のものだけを残す。
//! - 再帰の深さは呼び出し側（`Grammar::parse`）が CST の入れ子で制限する。

use crate::ast::Src;
use crate::cst::{Cst, Loc, Node, TextSpan};

use super::{
    Bindings, Grammar, GrammarValue, IdTok, Matcher, Meta, MetaKind, Metadata,
};

pub(crate) struct Engine<'g, 'c, V> {
    grammar: &'g Grammar<V>,
    cst: &'c Cst,
    journal: Vec<(Loc, MetaKind)>,
    bindings: Vec<(&'static str, V)>,
    unparsed: Vec<Loc>,
}

impl<'g, 'c, V: GrammarValue> Engine<'g, 'c, V> {
    pub(crate) fn new(grammar: &'g Grammar<V>, cst: &'c Cst) -> Self {
        Self {
            grammar,
            cst,
            journal: Vec::new(),
            bindings: Vec::new(),
            unparsed: Vec::new(),
        }
    }

    /// 単一ノード `root` を `matcher` で完全に消費できた場合だけ値を返す。
    pub(crate) fn run(&mut self, matcher: &'g Matcher<V>, root: Loc) -> Option<V> {
        let nodes = [root];
        let (value, end) = self.matches(matcher, &nodes, 0, root)?;
        if end != nodes.len() {
            self.unparsed = vec![root];
            return None;
        }
        Some(value)
    }

    pub(crate) fn finish(self) -> (Metadata, Vec<Loc>) {
        let mut metadata = Metadata::new();
        for (loc, kind) in self.journal {
            metadata.insert(loc, Meta { kind });
        }
        (metadata, self.unparsed)
    }

    /// 失敗時にはジャーナルと束縛を呼び出し前の長さへ戻す。
    ///
    /// 成功した照合の内側で見捨てられた分岐の未消費報告は、呼び出し前の状態へ戻す。
    fn matches(
        &mut self,
        matcher: &'g Matcher<V>,
        nodes: &[Loc],
        at: usize,
        parent: Loc,
    ) -> Option<(V, usize)> {
        let marks = (self.journal.len(), self.bindings.len());
        let reported = std::mem::take(&mut self.unparsed);
        let result = self.match_inner(matcher, nodes, at, parent);
        match result {
            Some(_) => self.unparsed = reported,
            None => {
                self.journal.truncate(marks.0);
                self.bindings.truncate(marks.1);
                if self.unparsed.is_empty() {
                    self.unparsed = reported;
                }
            }
        }
        result
    }

    fn match_inner(
        &mut self,
        matcher: &'g Matcher<V>,
        nodes: &[Loc],
        at: usize,
        parent: Loc,
    ) -> Option<(V, usize)> {
        let cst = self.cst;
        match matcher {
            Matcher::Any => {
                let loc = *nodes.get(at)?;
                Some((V::from_node(loc), at + 1))
            }
            Matcher::Kwd { text, kind } => {
                let loc = *nodes.get(at)?;
                match cst.node(loc)? {
                    Node::Id { text: found, .. } if found == text => {
                        self.journal.push((loc, *kind));
                        Some((
                            V::from_id(IdTok {
                                text: found.clone(),
                                loc,
                            }),
                            at + 1,
                        ))
                    }
                    _ => None,
                }
            }
            Matcher::Id { kind } => {
                let loc = *nodes.get(at)?;
                match cst.node(loc)? {
                    // 数字だけの語は number の領分（i64 に収まらなくても名前にはしない）
                    Node::Id { text, .. } if !self.grammar.is_kwd(text) && !is_digits(text) => {
                        if let Some(kind) = kind {
                            self.journal.push((loc, *kind));
                        }
                        Some((
                            V::from_id(IdTok {
                                text: text.clone(),
                                loc,
                            }),
                            at + 1,
                        ))
                    }
                    _ => None,
                }
            }
            Matcher::Number => {
                let loc = *nodes.get(at)?;
                match cst.node(loc)? {
                    Node::Id { text, .. } if is_digits(text) => {
                        let value = text.parse::<i64>().ok()?;
                        Some((V::from_number(value, loc), at + 1))
                    }
                    _ => None,
                }
            }
            Matcher::Text(inner) => {
                let loc = *nodes.get(at)?;
                let Node::Text { spans, .. } = cst.node(loc)? else {
                    return None;
                };
                let mut out = Vec::with_capacity(spans.len());
                for span in spans {
                    match span {
                        TextSpan::Text { text } => out.push(TextSpan::Text { text: text.clone() }),
                        TextSpan::Embed { item } => {
                            let item_nodes = [*item];
                            let (value, end) = self.matches(inner, &item_nodes, 0, *item)?;
                            if end != 1 {
                                return None;
                            }
                            out.push(TextSpan::Embed { item: value });
                        }
                    }
                }
                Some((V::from_text(out, loc), at + 1))
            }
            Matcher::List { kind, inner, meta } => {
                let loc = *nodes.get(at)?;
                let Node::List {
                    kind: found,
                    children,
                    ..
                } = cst.node(loc)?
                else {
                    return None;
                };
                if !kind.accepts(*found) {
                    return None;
                }
                let (value, end) = self.matches(inner, children, 0, loc)?;
                if end < children.len() {
                    self.unparsed = children[end..].to_vec();
                    log::trace!("list {loc} left {} children unparsed", children.len() - end);
                    return None;
                }
                if let Some(meta) = meta {
                    self.journal.push((loc, *meta));
                }
                Some((value, at + 1))
            }
            Matcher::Table { kind, row } => {
                let loc = *nodes.get(at)?;
                let Node::Table {
                    kind: found, rows, ..
                } = cst.node(loc)?
                else {
                    return None;
                };
                if found != kind {
                    return None;
                }
                let mut values = Vec::with_capacity(rows.len());
                for cells in rows {
                    let (value, end) = self.matches(row, cells, 0, loc)?;
                    if end < cells.len() {
                        self.unparsed = cells[end..].to_vec();
                        return None;
                    }
                    values.push(value);
                }
                Some((V::from_many(values), at + 1))
            }
            Matcher::Seq(items) => {
                let mut pos = at;
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    let (value, next) = self.matches(item, nodes, pos, parent)?;
                    values.push(value);
                    pos = next;
                }
                Some((V::from_many(values), pos))
            }
            Matcher::Or(items) => items
                .iter()
                .find_map(|item| self.matches(item, nodes, at, parent)),
            Matcher::Star(inner) => {
                let mut pos = at;
                let mut values = Vec::new();
                loop {
                    let marks = (self.journal.len(), self.bindings.len());
                    match self.matches(inner, nodes, pos, parent) {
                        Some((value, next)) if next > pos => {
                            values.push(value);
                            pos = next;
                        }
                        Some(_) => {
                            // 何も消費しない一致は打ち切る
                            self.journal.truncate(marks.0);
                            self.bindings.truncate(marks.1);
                            break;
                        }
                        None => break,
                    }
                }
                Some((V::from_many(values), pos))
            }
            Matcher::Opt(inner) => Some(
                self.matches(inner, nodes, at, parent)
                    .unwrap_or_else(|| (V::none(), at)),
            ),
            Matcher::Group { name, inner } => {
                let (value, end) = self.matches(inner, nodes, at, parent)?;
                self.bindings.push((*name, value.clone()));
                Some((value, end))
            }
            Matcher::Ref { rule, name } => {
                let grammar = self.grammar;
                let Some(target) = grammar.get(rule) else {
                    log::warn!("unknown grammar rule {rule}");
                    return None;
                };
                let (value, end) = self.matches(target, nodes, at, parent)?;
                if let Some(name) = name {
                    self.bindings.push((*name, value.clone()));
                }
                Some((value, end))
            }
            Matcher::Tx { inner, build } => {
                let start = self.bindings.len();
                let (_, end) = self.matches(inner, nodes, at, parent)?;
                let mut scope = Bindings::new(self.bindings.split_off(start));
                let src = src_of(nodes, at, end, parent);
                let value = build(&mut scope, src)?;
                Some((value, end))
            }
        }
    }
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// 消費した範囲の先頭と末尾から `Src` を作る。何も消費していなければ親の位置。
fn src_of(nodes: &[Loc], at: usize, end: usize, parent: Loc) -> Src {
    match &nodes[at.min(nodes.len())..end.min(nodes.len())] {
        [] => Src {
            left: parent,
            right: None,
        },
        [only] => Src {
            left: *only,
            right: None,
        },
        [first, .., last] => Src {
            left: *first,
            right: Some(*last),
        },
    }
}
