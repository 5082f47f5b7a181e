// パス: src/infer/mod.rs
// 役割: Algorithm W による型推論の状態（InferCtx）と単一化・インスタンス化を実装する
// 意図: 推論状態を明示的な値として受け渡し、各ステップをイベントとして記録する
// 関連ファイル: src/infer/expr.rs, src/infer/stmt.rs, src/infer/pattern.rs, src/events.rs
//! 型推論モジュール
//!
//! - 置換は推論全体で 1 つを持続させ、単一化のたびに差分を合成する。
//! - 型変数・単一化・スコープ・説明スタックの変化をすべてイベント列に積む。
//! - 失敗時もそこまでのイベント列（部分トレース）を呼び出し側へ返す。

use std::collections::BTreeMap;

use thiserror::Error;

use crate::ast::{Src, Stmt};
use crate::errors::TypeError;
use crate::events::{Event, StackText, TvarMeta, Trace};
use crate::typesys::{
    compose_subst, make_name, type_apply, unify_types, Scheme, Scope, Subst, Tenv, Type,
};

mod expr;
mod pattern;
mod stack;
mod stmt;

pub use stmt::StmtResult;

/// 推論 1 回分の状態。新しく作ることがリセットに相当する。
#[derive(Clone, Debug, Default)]
pub struct InferCtx {
    next_id: usize,
    subst: Subst,
    events: Vec<Event>,
    tvar_meta: BTreeMap<String, TvarMeta>,
    latest_scope: Option<Scope>,
    stack: Vec<Vec<StackText>>,
}

/// 型エラーと、失敗までに記録されたトレース。
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct InferFailure {
    pub error: TypeError,
    pub trace: Trace,
}

impl InferCtx {
    pub fn new() -> Self {
        Self::default()
    }

    /// 現在の置換。
    pub fn subst(&self) -> &Subst {
        &self.subst
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn tvar_meta(&self) -> &BTreeMap<String, TvarMeta> {
        &self.tvar_meta
    }

    /// 現在の置換を型に適用する。
    pub fn apply(&self, t: &Type) -> Type {
        type_apply(&self.subst, t)
    }

    /// 新しい型変数を作り、作った理由を記録する。
    pub fn new_type_var(&mut self, meta: TvarMeta) -> Type {
        let name = make_name(self.next_id);
        self.next_id += 1;
        self.events.push(Event::NewVar { name: name.clone() });
        self.tvar_meta.insert(name.clone(), meta);
        Type::var(name)
    }

    /// 量化変数ごとに新しい型変数を割り当てた置換。
    pub(crate) fn subst_for_free(&mut self, vars: &[String]) -> Subst {
        vars.iter()
            .map(|prev| {
                let fresh = self.new_type_var(TvarMeta::Free { prev: prev.clone() });
                (prev.clone(), fresh)
            })
            .collect()
    }

    /// スキームの量化変数を新しい型変数で置き換える。
    pub fn instantiate(&mut self, scheme: &Scheme) -> Type {
        let subst = self.subst_for_free(&scheme.vars);
        type_apply(&subst, &scheme.body)
    }

    /// 2 つの型を単一化し、差分を持続置換へ合成する。
    pub fn unify(
        &mut self,
        one: &Type,
        two: &Type,
        src: Src,
        one_name: &str,
        two_name: &str,
    ) -> Result<(), TypeError> {
        self.unify_with(one, two, src, one_name, two_name, None)
    }

    /// 差分が空でなければ、置換適用後の型でもう一度 `unify` イベントを発行する。
    pub fn unify_with(
        &mut self,
        one: &Type,
        two: &Type,
        src: Src,
        one_name: &str,
        two_name: &str,
        message: Option<&str>,
    ) -> Result<(), TypeError> {
        let one = self.apply(one);
        let two = self.apply(two);
        let delta = match unify_types(&one, &two) {
            Ok(delta) => delta,
            Err(err) => {
                log::debug!("unify failed at {src}: {one} vs {two}: {err}");
                return Err(err);
            }
        };
        log::trace!("unify {one} ~ {two} => {} bindings", delta.len());
        self.events.push(Event::Unify {
            one: one.clone(),
            two: two.clone(),
            subst: delta.clone(),
            src,
            one_name: one_name.to_string(),
            two_name: two_name.to_string(),
            message: message.map(str::to_string),
        });
        self.subst = compose_subst(&delta, &self.subst)?;
        if !delta.is_empty() {
            self.events.push(Event::Unify {
                one: self.apply(&one),
                two: self.apply(&two),
                subst: delta,
                src,
                one_name: one_name.to_string(),
                two_name: two_name.to_string(),
                message: message.map(str::to_string),
            });
        }
        Ok(())
    }

    /// 記録を取り出す。
    pub fn into_trace(self) -> Trace {
        Trace {
            events: self.events,
            subst: self.subst,
            tvar_meta: self.tvar_meta,
        }
    }

    /// 型エラーに部分トレースを添える。
    pub fn fail(self, error: TypeError) -> InferFailure {
        InferFailure {
            error,
            trace: self.into_trace(),
        }
    }
}

/// 新しい状態で `stmt` を推論し、置換適用済みの型とトレースを返す。
#[allow(clippy::result_large_err)]
pub fn infer_top(tenv: &Tenv, stmt: &Stmt) -> Result<(Type, Trace), InferFailure> {
    let mut ctx = InferCtx::new();
    match ctx.infer_stmt(tenv, stmt) {
        Ok(result) => {
            let ty = ctx.apply(&result.value);
            log::debug!("inferred {ty} with {} events", ctx.events.len());
            Ok((ty, ctx.into_trace()))
        }
        Err(error) => Err(ctx.fail(error)),
    }
}
