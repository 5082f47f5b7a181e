// パス: src/events.rs
// 役割: 推論の過程を記録するイベント列と、その集計・再生ユーティリティ
// 意図: 外部の可視化器が導出を 1 ステップずつ再構成できる情報を残す
// 関連ファイル: src/infer/mod.rs, src/infer/stack.rs, tests/trace_events.rs
//! 推論イベント
//!
//! - イベントは追記専用。型は発行時点の値をコピーして保持する。
//! - `unify` イベントは置換の差分を持ち、差分を順に適用すれば最終置換と同じ結果になる。

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::ast::Src;
use crate::typesys::{type_apply, Scope, Subst, Type};

/// 型変数を作った理由。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TvarMeta {
    /// スキームの量化変数 `prev` のインスタンス
    Free { prev: String },
    ReturnAny { src: Src },
    PatVar { name: String, src: Src },
    PatAny { src: Src },
    LambdaReturn { src: Src },
    ApplyResult { src: Src },
    MatchResult { src: Src },
}

/// 説明スタックの 1 要素。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StackText {
    Text(String),
    Kwd(String),
    Type(Type),
    Hole { active: bool },
}

impl StackText {
    pub fn text(s: impl Into<String>) -> Self {
        StackText::Text(s.into())
    }
    pub fn kwd(s: impl Into<String>) -> Self {
        StackText::Kwd(s.into())
    }
    pub fn hole() -> Self {
        StackText::Hole { active: false }
    }
    pub fn active() -> Self {
        StackText::Hole { active: true }
    }
}

impl fmt::Display for StackText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackText::Text(s) | StackText::Kwd(s) => f.write_str(s),
            StackText::Type(t) => write!(f, "{t}"),
            StackText::Hole { active: false } => f.write_str("_"),
            StackText::Hole { active: true } => f.write_str("[_]"),
        }
    }
}

/// 説明スタックの 1 段を文字列にする。
pub fn render_stack_line(items: &[StackText]) -> String {
    items
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    NewVar {
        name: String,
    },
    Infer {
        src: Src,
        value: Type,
    },
    Unify {
        one: Type,
        two: Type,
        subst: Subst,
        src: Src,
        #[serde(rename = "oneName")]
        one_name: String,
        #[serde(rename = "twoName")]
        two_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Scope {
        scope: Scope,
    },
    StackPush {
        src: Src,
        value: Vec<StackText>,
    },
    StackPop,
    StackBreak {
        title: String,
    },
}

impl Event {
    /// 表示用の短い種別名。
    pub fn kind(&self) -> &'static str {
        match self {
            Event::NewVar { .. } => "new-var",
            Event::Infer { .. } => "infer",
            Event::Unify { .. } => "unify",
            Event::Scope { .. } => "scope",
            Event::StackPush { .. } => "stack-push",
            Event::StackPop => "stack-pop",
            Event::StackBreak { .. } => "stack-break",
        }
    }
}

/// 推論 1 回分の記録。
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Trace {
    pub events: Vec<Event>,
    pub subst: Subst,
    #[serde(rename = "tvarMeta")]
    pub tvar_meta: BTreeMap<String, TvarMeta>,
}

/// 可視化器が進める「ステップ」の数。
///
/// `stack-break` と、差分が空でない `unify`（前後 2 回発行される）を数える。
pub fn step_count(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| match e {
            Event::StackBreak { .. } => true,
            Event::Unify { subst, .. } => !subst.is_empty(),
            _ => false,
        })
        .count()
}

/// `unify` イベントの差分を発行順に列挙する。
pub fn unify_deltas(events: &[Event]) -> Vec<&Subst> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Unify { subst, .. } => Some(subst),
            _ => None,
        })
        .collect()
}

/// すべての差分を順に適用して、各 `infer` イベントの型を再生する。
pub fn replay_infer_types(events: &[Event]) -> Vec<(Src, Type)> {
    let deltas = unify_deltas(events);
    events
        .iter()
        .filter_map(|e| match e {
            Event::Infer { src, value } => {
                let ty = deltas
                    .iter()
                    .fold(value.clone(), |t, delta| type_apply(delta, &t));
                Some((*src, ty))
            }
            _ => None,
        })
        .collect()
}
