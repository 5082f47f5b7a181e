// パス: src/infer/stmt.rs
// 役割: 文（return / let / 式文 / for）の型推論
// 意図: let の自己参照束縛と一般化、for の初期化スコープの引き回しをここに集める
// 関連ファイル: src/infer/mod.rs, src/infer/expr.rs, src/infer/pattern.rs

use super::InferCtx;
use crate::ast::{Expr, Pat, Src, Stmt};
use crate::errors::TypeError;
use crate::events::{Event, StackText, TvarMeta};
use crate::typesys::{
    generalize, scope_apply, t_bool, t_void, tenv_apply, Scheme, Scope, Tenv, Type,
};

/// 文の推論結果。`scope` は後続の文に見える束縛の差分。
#[derive(Clone, Debug, PartialEq)]
pub struct StmtResult {
    pub value: Type,
    pub scope: Option<Scope>,
}

impl StmtResult {
    fn value(value: Type) -> Self {
        Self { value, scope: None }
    }
}

impl InferCtx {
    /// 文の型と、束縛が増えた場合はそのスコープを求める。
    pub fn infer_stmt(&mut self, tenv: &Tenv, stmt: &Stmt) -> Result<StmtResult, TypeError> {
        match stmt {
            Stmt::Return { value, src } => self.infer_return(tenv, value.as_ref(), *src),
            Stmt::Let {
                pat: Pat::Var { name, src: pat_src },
                init,
                src,
            } => self.infer_let_var(tenv, name, *pat_src, init, *src),
            Stmt::Let { pat, init, src } => self.infer_let_pattern(tenv, pat, init, *src),
            Stmt::Expr { expr, .. } => Ok(StmtResult::value(self.infer_expr(tenv, expr)?)),
            Stmt::For {
                init,
                cond,
                update,
                body,
                src,
            } => {
                self.stack_push(*src, vec![StackText::kwd("for"), StackText::active()]);
                self.stack_break("'for' loop");
                let init = self.infer_stmt(tenv, init)?;
                let extra = init.scope.unwrap_or_default();
                let env = tenv_apply(&self.subst, tenv).with_scope(&scope_apply(&self.subst, &extra));
                let cond_t = self.infer_expr(&env, cond)?;
                self.unify(&cond_t, &t_bool(), cond.src(), "condition", "bool")?;
                let env = tenv_apply(&self.subst, &env);
                self.infer_expr(&env, update)?;
                let env = tenv_apply(&self.subst, &env);
                self.infer_expr(&env, body)?;
                self.stack_pop();
                Ok(StmtResult::value(t_void()))
            }
        }
    }

    fn infer_return(
        &mut self,
        tenv: &Tenv,
        value: Option<&Expr>,
        src: Src,
    ) -> Result<StmtResult, TypeError> {
        let any = self.new_type_var(TvarMeta::ReturnAny { src });
        let expected = tenv
            .lookup("return")
            .ok_or(TypeError::ReturnOutsideFunction)?
            .body
            .clone();
        self.stack_push(src, vec![StackText::kwd("return"), StackText::active()]);
        self.stack_break("'return' statement");
        let found = match value {
            Some(expr) => self.infer_expr(tenv, expr)?,
            None => t_void(),
        };
        self.unify(&expected, &found, src, "return type", "returned value")?;
        self.stack_replace(
            src,
            vec![StackText::kwd("return"), StackText::Type(self.apply(&found))],
        );
        self.stack_break("returned type");
        self.stack_pop();
        Ok(StmtResult::value(any))
    }

    fn infer_let_var(
        &mut self,
        tenv: &Tenv,
        name: &str,
        pat_src: Src,
        init: &Expr,
        src: Src,
    ) -> Result<StmtResult, TypeError> {
        let line = |name: StackText, ty: StackText, value: StackText| {
            vec![StackText::kwd("let"), name, ty, StackText::text("="), value]
        };
        self.stack_push(
            src,
            line(StackText::hole(), StackText::hole(), StackText::hole()),
        );
        self.stack_break("'let' statement");
        self.stack_replace(
            src,
            line(StackText::text(name), StackText::hole(), StackText::hole()),
        );
        self.stack_break("pattern name");

        let pv = self.new_type_var(TvarMeta::PatVar {
            name: name.to_string(),
            src: pat_src,
        });
        self.events.push(Event::Infer {
            src: pat_src,
            value: pv.clone(),
        });
        self.stack_push(
            pat_src,
            vec![
                StackText::text(name),
                StackText::text("→"),
                StackText::Type(pv.clone()),
            ],
        );
        self.stack_break("new type variable");
        self.stack_pop();
        self.stack_replace(
            src,
            line(
                StackText::text(name),
                StackText::Type(pv.clone()),
                StackText::hole(),
            ),
        );
        self.stack_break("pattern type");
        self.stack_replace(
            src,
            line(
                StackText::text(name),
                StackText::Type(pv.clone()),
                StackText::active(),
            ),
        );

        // 再帰のため、初期化式の中から自分自身が見える
        let own = Scope::from([(name.to_string(), Scheme::mono(pv.clone()))]);
        let value = self.infer_expr(&tenv.with_scope(&own), init)?;
        let bound = self.apply(&pv);
        self.unify(&bound, &value, src, "pattern", "value")?;
        self.stack_replace(
            src,
            line(
                StackText::text(name),
                StackText::Type(self.apply(&pv)),
                StackText::Type(self.apply(&value)),
            ),
        );
        self.stack_break("unify pattern and value");
        self.stack_pop();

        let value = self.apply(&value);
        let scheme = if init.is_lambda() {
            generalize(&tenv_apply(&self.subst, tenv), &value)
        } else {
            Scheme::mono(value)
        };
        log::trace!("let {name}: {scheme}");
        Ok(StmtResult {
            value: t_void(),
            scope: Some(Scope::from([(name.to_string(), scheme)])),
        })
    }

    fn infer_let_pattern(
        &mut self,
        tenv: &Tenv,
        pat: &Pat,
        init: &Expr,
        src: Src,
    ) -> Result<StmtResult, TypeError> {
        self.stack_push(
            src,
            vec![
                StackText::kwd("let"),
                StackText::text(pat.to_string()),
                StackText::text("="),
                StackText::active(),
            ],
        );
        self.stack_break("'let' statement");
        let (pat_t, scope) = self.infer_pattern(tenv, pat)?;
        let value = self.infer_expr(tenv, init)?;
        self.unify(&pat_t, &value, src, "pattern", "value")?;
        self.stack_break("unify pattern and value");
        self.stack_pop();
        Ok(StmtResult {
            value: t_void(),
            scope: Some(scope_apply(&self.subst, &scope)),
        })
    }
}
