// パス: src/lexer.rs
// 役割: ソース文字列を入れ子リスト形式の CST に変換する字句解析器
// 意図: 文字クラスと区切り文字の設定だけで smooshed/spaced 構造を組み立てる
// 関連ファイル: src/cst.rs, src/errors.rs, tests/lexer_cst.rs
//! 字句解析モジュール
//!
//! - 「開いているリスト」のスタックを保持し、1 文字ずつ CST を構築する。
//! - 空白なしで隣接する原子は `smooshed`、空白区切りは `spaced` リストにまとめる。
//! - 数値リテラルは特別扱いせず、クラス 0 の文字として `id` ノードに入る。
//! - すべてのノードにバイト範囲を記録し、診断情報と連携させる。

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::cst::{Cst, ListKind, Loc, Node, Span, TextSpan};
use crate::errors::LexError;

/// 字句解析の設定。`punct[i]` に含まれる文字はクラス `i + 1`、それ以外はクラス 0。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexConfig {
    pub punct: Vec<String>,
    pub space: String,
    pub sep: String,
    pub table_col: String,
    pub table_row: String,
    pub table_new: String,
    #[serde(default)]
    pub xml: bool,
}

impl LexConfig {
    /// JS 風の構文向け設定。
    pub fn js() -> Self {
        Self {
            punct: vec![
                ".".into(),
                "/".into(),
                "~`!@#$%^&*+-=\\/?:><".into(),
            ],
            space: " \t\r".into(),
            sep: ",;\n".into(),
            table_col: ",:".into(),
            table_row: ";\n".into(),
            table_new: ":".into(),
            xml: true,
        }
    }

    /// Lisp 風の構文向け設定（空白が兄弟の区切りになる）。
    pub fn lisp() -> Self {
        Self {
            punct: vec![";".into(), ".".into(), "@".into(), "=#+".into()],
            space: String::new(),
            sep: " \n".into(),
            table_col: " :".into(),
            table_row: "\n".into(),
            table_new: ":".into(),
            xml: false,
        }
    }
}

impl Default for LexConfig {
    fn default() -> Self {
        Self::js()
    }
}

/// 既定の JS 風設定。
pub static JS: Lazy<LexConfig> = Lazy::new(LexConfig::js);

/// 文字の分類。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharKind {
    Class(usize),
    Space,
    Sep,
    Quote,
}

/// 文字クラスを求める（0 はテキスト）。
pub fn char_class(ch: char, config: &LexConfig) -> usize {
    config
        .punct
        .iter()
        .position(|set| set.contains(ch))
        .map(|i| i + 1)
        .unwrap_or(0)
}

/// 文字の種別を求める。
pub fn text_kind(ch: char, config: &LexConfig) -> CharKind {
    if ch == '"' {
        CharKind::Quote
    } else if config.sep.contains(ch) {
        CharKind::Sep
    } else if config.space.contains(ch) {
        CharKind::Space
    } else {
        CharKind::Class(char_class(ch, config))
    }
}

#[derive(Debug)]
/// 行頭オフセットを事前計算し、行・列情報を素早く算出するヘルパ。
pub struct LineMap {
    starts: Vec<usize>,
}

impl LineMap {
    /// 入力全体を 1 度だけ走査して行頭インデックスを収集する。
    pub fn new(src: &str) -> Self {
        let mut starts = vec![0];
        for (idx, ch) in src.char_indices() {
            if ch == '\n' {
                starts.push(idx + ch.len_utf8());
            }
        }
        Self { starts }
    }

    /// 指定バイト位置の行番号と桁位置を返す。
    pub fn locate(&self, src: &str, pos: usize) -> (usize, usize) {
        let pos = pos.min(src.len());
        let idx = match self.starts.binary_search(&pos) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };
        let start = self.starts[idx];
        let col = src.get(start..pos).map(|s| s.chars().count()).unwrap_or(0) + 1;
        (idx + 1, col)
    }

    /// 指定行に対応するテキスト断片を返す（改行は除去する）。
    pub fn line_text<'a>(&self, src: &'a str, line: usize) -> &'a str {
        if line == 0 || line > self.starts.len() {
            return "";
        }
        let start = self.starts[line - 1];
        let end = self.starts.get(line).copied().unwrap_or(src.len());
        let slice = &src[start..end];
        slice.strip_suffix('\n').unwrap_or(slice)
    }
}

// 構築途中のノード。空きスロット（区切り直後）は `None` で表す。
#[derive(Debug)]
enum Draft {
    Id {
        text: String,
    },
    Text {
        spans: Vec<TextSpan<Loc>>,
    },
    List {
        kind: ListKind,
        children: Vec<Option<Loc>>,
    },
    Table {
        kind: ListKind,
        rows: Vec<Vec<Option<Loc>>>,
    },
}

#[derive(Clone, Copy, Debug)]
enum Frame {
    List(Loc),
    Table(Loc),
    Text(Loc),
    Embed { text: Loc, list: Loc },
}

struct Lexer<'a> {
    config: &'a LexConfig,
    src: &'a str,
    drafts: Vec<Draft>,
    spans: Vec<Span>,
    path: Vec<Frame>,
    // 伸長中の id とその文字クラス
    current_id: Option<(Loc, usize)>,
}

/// ソースを CST に変換する。
///
/// # Examples
/// ```
/// use algw::lexer::{lex, LexConfig};
/// let cst = lex(&LexConfig::js(), "hello+folks").unwrap();
/// assert_eq!(cst.roots.len(), 1);
/// ```
pub fn lex(config: &LexConfig, src: &str) -> Result<Cst, LexError> {
    let cst = Lexer::new(config, src).run()?;
    log::debug!(
        "lexed {} bytes into {} nodes ({} roots)",
        src.len(),
        cst.nodes.len(),
        cst.roots.len()
    );
    Ok(cst)
}

impl<'a> Lexer<'a> {
    fn new(config: &'a LexConfig, src: &'a str) -> Self {
        let mut lexer = Self {
            config,
            src,
            drafts: Vec::new(),
            spans: Vec::new(),
            path: Vec::new(),
            current_id: None,
        };
        let top = lexer.mint(
            Draft::List {
                kind: ListKind::Curly,
                children: Vec::new(),
            },
            0,
            src.len(),
        );
        lexer.path.push(Frame::List(top));
        lexer
    }

    fn run(mut self) -> Result<Cst, LexError> {
        let chars: Vec<(usize, char)> = self.src.char_indices().collect();
        let mut i = 0;
        while i < chars.len() {
            let (pos, ch) = chars[i];
            let next = chars.get(i + 1).map(|(_, c)| *c);
            i += self.step(pos, ch, next)?;
        }
        self.finish()
    }

    /// 1 文字（または 2 文字）を処理し、消費した文字数を返す。
    fn step(&mut self, pos: usize, ch: char, next: Option<char>) -> Result<usize, LexError> {
        if let Some(Frame::Text(text)) = self.path.last().copied() {
            return self.step_text(text, pos, ch, next);
        }

        if let Some(kind) = ListKind::from_opener(ch) {
            self.current_id = None;
            let is_table = kind == ListKind::Curly
                && next.map_or(false, |c| self.config.table_new.contains(c));
            if is_table {
                let loc = self.mint(
                    Draft::Table {
                        kind,
                        rows: vec![Vec::new()],
                    },
                    pos,
                    pos + 2,
                );
                self.add(loc);
                self.path.push(Frame::Table(loc));
                return Ok(2);
            }
            let loc = self.mint(
                Draft::List {
                    kind,
                    children: Vec::new(),
                },
                pos,
                pos + 1,
            );
            self.add(loc);
            self.path.push(Frame::List(loc));
            return Ok(1);
        }

        if let Some(kind) = ListKind::from_closer(ch) {
            self.current_id = None;
            self.close(kind, pos)?;
            return Ok(1);
        }

        if ch == '"' {
            self.current_id = None;
            let loc = self.mint(Draft::Text { spans: Vec::new() }, pos, pos + 1);
            self.add(loc);
            self.path.push(Frame::Text(loc));
            return Ok(1);
        }

        let in_table = matches!(self.enclosing(), Frame::Table(_));
        if in_table && (self.config.table_row.contains(ch) || self.config.table_col.contains(ch)) {
            self.current_id = None;
            self.pop_tight(true);
            if let Frame::Table(loc) = self.enclosing() {
                if let Some(Draft::Table { rows, .. }) = self.drafts.get_mut(loc.index()) {
                    if self.config.table_row.contains(ch) {
                        rows.push(Vec::new());
                    } else if let Some(row) = rows.last_mut() {
                        push_blank(row);
                    }
                }
            }
            return Ok(1);
        }

        match text_kind(ch, self.config) {
            CharKind::Sep => {
                self.current_id = None;
                self.pop_tight(true);
                let parent = self.container();
                if let Some(slots) = self.slots_mut(parent) {
                    push_blank(slots);
                }
            }
            CharKind::Space => {
                self.current_id = None;
                self.space(pos);
            }
            // 引用符は上で処理済み
            CharKind::Quote => {}
            CharKind::Class(class) => self.id_char(pos, ch, class),
        }
        Ok(1)
    }

    fn step_text(
        &mut self,
        text: Loc,
        pos: usize,
        ch: char,
        next: Option<char>,
    ) -> Result<usize, LexError> {
        match ch {
            '"' => {
                self.path.pop();
                self.spans[text.index()].end = pos + 1;
                Ok(1)
            }
            '\\' => {
                let Some(escaped) = next else {
                    return Err(LexError::UnterminatedText {
                        pos: self.spans[text.index()].start,
                    });
                };
                let decoded = match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                };
                self.push_text_char(text, decoded);
                Ok(2)
            }
            '$' if next == Some('{') => {
                let list = self.mint(
                    Draft::List {
                        kind: ListKind::Curly,
                        children: Vec::new(),
                    },
                    pos,
                    pos + 2,
                );
                self.path.push(Frame::Embed { text, list });
                Ok(2)
            }
            _ => {
                self.push_text_char(text, ch);
                Ok(1)
            }
        }
    }

    fn push_text_char(&mut self, text: Loc, ch: char) {
        if let Some(Draft::Text { spans }) = self.drafts.get_mut(text.index()) {
            match spans.last_mut() {
                Some(TextSpan::Text { text }) => text.push(ch),
                _ => spans.push(TextSpan::Text {
                    text: ch.to_string(),
                }),
            }
        }
    }

    fn id_char(&mut self, pos: usize, ch: char, class: usize) {
        let end = pos + ch.len_utf8();
        if let Some((loc, current)) = self.current_id {
            if current == class {
                if let Some(Draft::Id { text }) = self.drafts.get_mut(loc.index()) {
                    text.push(ch);
                }
                self.spans[loc.index()].end = end;
                return;
            }
        }
        let loc = self.mint(
            Draft::Id {
                text: ch.to_string(),
            },
            pos,
            end,
        );
        self.add(loc);
        self.current_id = Some((loc, class));
    }

    fn space(&mut self, pos: usize) {
        self.pop_tight(false);
        let parent = self.container();
        if self.list_kind(parent) == Some(ListKind::Spaced) {
            if let Some(slots) = self.slots_mut(parent) {
                push_blank(slots);
            }
            return;
        }
        let prev = match self.slots_mut(parent).and_then(|slots| slots.last().copied()) {
            Some(Some(prev)) => prev,
            // 先頭・区切り直後の空白は無視する
            _ => return,
        };
        let start = self.spans[prev.index()].start;
        let spaced = self.mint(
            Draft::List {
                kind: ListKind::Spaced,
                children: vec![Some(prev), None],
            },
            start,
            pos + 1,
        );
        if let Some(last) = self.slots_mut(parent).and_then(|slots| slots.last_mut()) {
            *last = Some(spaced);
        }
        self.path.push(Frame::List(spaced));
    }

    fn close(&mut self, kind: ListKind, pos: usize) -> Result<(), LexError> {
        self.pop_tight(true);
        let depth = self.path.len();
        match self.path.last().copied() {
            Some(Frame::Embed { text, list }) => {
                if kind != ListKind::Curly {
                    return Err(LexError::UnexpectedClose {
                        expected: Some(ListKind::Curly),
                        found: kind,
                        pos,
                    });
                }
                self.spans[list.index()].end = pos + 1;
                let children = self.filled_children(list);
                let item = match children.as_slice() {
                    [] => {
                        return Err(LexError::EmptyEmbed {
                            pos: self.spans[list.index()].start,
                        })
                    }
                    [only] => *only,
                    _ => list,
                };
                if let Some(Draft::Text { spans }) = self.drafts.get_mut(text.index()) {
                    spans.push(TextSpan::Embed { item });
                }
                self.path.pop();
                Ok(())
            }
            Some(Frame::List(loc)) | Some(Frame::Table(loc)) if depth > 1 => {
                let open = self.list_kind(loc).unwrap_or(ListKind::Curly);
                if open != kind {
                    return Err(LexError::UnexpectedClose {
                        expected: Some(open),
                        found: kind,
                        pos,
                    });
                }
                self.spans[loc.index()].end = pos + 1;
                self.path.pop();
                Ok(())
            }
            _ => Err(LexError::UnexpectedClose {
                expected: None,
                found: kind,
                pos,
            }),
        }
    }

    fn finish(mut self) -> Result<Cst, LexError> {
        if let Some(frame) = self.path.last().copied() {
            match frame {
                Frame::Text(loc) | Frame::Embed { text: loc, .. } => {
                    return Err(LexError::UnterminatedText {
                        pos: self.spans[loc.index()].start,
                    });
                }
                _ => {}
            }
        }
        self.pop_tight(true);
        if self.path.len() > 1 {
            let loc = match self.path.last().copied() {
                Some(Frame::List(loc)) | Some(Frame::Table(loc)) => loc,
                _ => Loc(0),
            };
            return Err(LexError::UnclosedList {
                kind: self.list_kind(loc).unwrap_or(ListKind::Curly),
                pos: self.spans[loc.index()].start,
            });
        }
        self.finalize()
    }

    fn finalize(self) -> Result<Cst, LexError> {
        let Lexer {
            src, drafts, spans, ..
        } = self;
        let mut spans = spans;
        let resolve = |loc: Loc| collapse(&drafts, loc);
        for idx in 0..drafts.len() {
            fix_span(&drafts, &mut spans, Loc(idx as u32));
        }

        let mut nodes = Vec::with_capacity(drafts.len());
        let mut roots = Vec::new();
        for (idx, draft) in drafts.iter().enumerate() {
            let loc = Loc(idx as u32);
            let span = spans[idx];
            let multiline = src
                .get(span.start..span.end)
                .map_or(false, |s| s.contains('\n'));
            let node = match draft {
                Draft::Id { text } => Node::Id {
                    text: text.clone(),
                    loc,
                },
                Draft::Text { spans } => Node::Text {
                    spans: spans
                        .iter()
                        .map(|s| match s {
                            TextSpan::Embed { item } => TextSpan::Embed {
                                item: resolve(*item),
                            },
                            TextSpan::Text { text } => TextSpan::Text { text: text.clone() },
                        })
                        .collect(),
                    loc,
                },
                Draft::List { kind, children } => {
                    let children: Vec<Loc> = children.iter().flatten().map(|c| resolve(*c)).collect();
                    if idx == 0 {
                        roots = children.clone();
                    }
                    Node::List {
                        kind: *kind,
                        children,
                        force_multiline: multiline,
                        loc,
                    }
                }
                Draft::Table { kind, rows } => Node::Table {
                    kind: *kind,
                    rows: rows
                        .iter()
                        .map(|row| row.iter().flatten().map(|c| resolve(*c)).collect::<Vec<_>>())
                        .filter(|row| !row.is_empty())
                        .collect(),
                    force_multiline: multiline,
                    loc,
                },
            };
            nodes.push(node);
        }
        Ok(Cst {
            nodes,
            roots,
            spans,
        })
    }

    fn mint(&mut self, draft: Draft, start: usize, end: usize) -> Loc {
        let loc = Loc(self.drafts.len() as u32);
        self.drafts.push(draft);
        self.spans.push(Span { start, end });
        loc
    }

    /// 新しいノードを現在の親へ追加する。直前の兄弟と隣接する場合は smooshed でまとめる。
    fn add(&mut self, node: Loc) {
        let parent = self.container();
        let smooshed = self.list_kind(parent) == Some(ListKind::Smooshed);
        let Some(slots) = self.slots_mut(parent) else {
            return;
        };
        if slots.is_empty() || smooshed {
            slots.push(Some(node));
            return;
        }
        let prev = match slots.last_mut() {
            Some(slot @ None) => {
                *slot = Some(node);
                return;
            }
            Some(Some(prev)) => *prev,
            None => return,
        };
        let start = self.spans[prev.index()].start;
        let end = self.spans[node.index()].end;
        let smoosh = self.mint(
            Draft::List {
                kind: ListKind::Smooshed,
                children: vec![Some(prev), Some(node)],
            },
            start,
            end,
        );
        if let Some(last) = self.slots_mut(parent).and_then(|slots| slots.last_mut()) {
            *last = Some(smoosh);
        }
        self.path.push(Frame::List(smoosh));
    }

    /// smooshed（と必要なら spaced）のフレームを閉じる。
    fn pop_tight(&mut self, include_spaced: bool) {
        while let Some(Frame::List(loc)) = self.path.last().copied() {
            match self.list_kind(loc) {
                Some(ListKind::Smooshed) => {}
                Some(ListKind::Spaced) if include_spaced => {}
                _ => break,
            }
            self.path.pop();
        }
    }

    /// 子を追加する先（リスト・テーブル・埋め込み）の位置。
    fn container(&self) -> Loc {
        match self.path.last().copied() {
            Some(Frame::List(loc)) | Some(Frame::Table(loc)) => loc,
            Some(Frame::Embed { list, .. }) => list,
            Some(Frame::Text(loc)) => loc,
            None => Loc(0),
        }
    }

    /// smooshed/spaced を飛ばした最も内側の入れ物。
    fn enclosing(&self) -> Frame {
        for frame in self.path.iter().rev() {
            if let Frame::List(loc) = frame {
                if matches!(
                    self.list_kind(*loc),
                    Some(ListKind::Smooshed) | Some(ListKind::Spaced)
                ) {
                    continue;
                }
            }
            return *frame;
        }
        Frame::List(Loc(0))
    }

    fn list_kind(&self, loc: Loc) -> Option<ListKind> {
        match self.drafts.get(loc.index()) {
            Some(Draft::List { kind, .. }) | Some(Draft::Table { kind, .. }) => Some(*kind),
            _ => None,
        }
    }

    fn slots_mut(&mut self, loc: Loc) -> Option<&mut Vec<Option<Loc>>> {
        match self.drafts.get_mut(loc.index()) {
            Some(Draft::List { children, .. }) => Some(children),
            Some(Draft::Table { rows, .. }) => {
                if rows.is_empty() {
                    rows.push(Vec::new());
                }
                rows.last_mut()
            }
            _ => None,
        }
    }

    fn filled_children(&self, loc: Loc) -> Vec<Loc> {
        match self.drafts.get(loc.index()) {
            Some(Draft::List { children, .. }) => children.iter().flatten().copied().collect(),
            _ => Vec::new(),
        }
    }
}

fn push_blank(slots: &mut Vec<Option<Loc>>) {
    if matches!(slots.last(), Some(Some(_))) {
        slots.push(None);
    }
}

// 子が 1 つだけの smooshed/spaced はその子に置き換える。
fn collapse(drafts: &[Draft], loc: Loc) -> Loc {
    if let Some(Draft::List { kind, children }) = drafts.get(loc.index()) {
        if matches!(kind, ListKind::Smooshed | ListKind::Spaced) {
            let filled: Vec<Loc> = children.iter().flatten().copied().collect();
            if let [only] = filled.as_slice() {
                return collapse(drafts, *only);
            }
        }
    }
    loc
}

// smooshed/spaced の範囲は子の範囲から決める。
fn fix_span(drafts: &[Draft], spans: &mut [Span], loc: Loc) {
    let Some(Draft::List { kind, children }) = drafts.get(loc.index()) else {
        return;
    };
    if !matches!(kind, ListKind::Smooshed | ListKind::Spaced) {
        return;
    }
    let filled: Vec<Loc> = children.iter().flatten().copied().collect();
    for child in &filled {
        fix_span(drafts, spans, *child);
    }
    if let (Some(first), Some(last)) = (filled.first(), filled.last()) {
        spans[loc.index()] = Span {
            start: spans[first.index()].start,
            end: spans[last.index()].end,
        };
    }
}
