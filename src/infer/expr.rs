// パス: src/infer/expr.rs
// 役割: 式の型推論（ラムダ・適用・if・match・ブロックなど）
// 意図: 各式の推論後に `infer` イベントを残し、スコープが変わったら `scope` を発行する
// 関連ファイル: src/infer/mod.rs, src/infer/stmt.rs, src/infer/pattern.rs

use super::InferCtx;
use crate::ast::{Case, Expr, Pat, Src, Stmt};
use crate::errors::TypeError;
use crate::events::{Event, StackText, TvarMeta};
use crate::typesys::{
    scope_apply, t_bool, t_string, t_void, tenv_apply, Scheme, Scope, Tenv, Type,
};

impl InferCtx {
    /// 式の型を推論し、`infer` イベントとして記録する。
    pub fn infer_expr(&mut self, tenv: &Tenv, expr: &Expr) -> Result<Type, TypeError> {
        self.note_scope(tenv);
        let ty = self.infer_expr_inner(tenv, expr)?;
        self.events.push(Event::Infer {
            src: expr.src(),
            value: ty.clone(),
        });
        Ok(ty)
    }

    /// 置換適用後のスコープが直前の記録と異なれば `scope` イベントを出す。
    fn note_scope(&mut self, tenv: &Tenv) {
        let current = scope_apply(&self.subst, &tenv.scope);
        let changed = match &self.latest_scope {
            Some(latest) => scope_apply(&self.subst, latest) != current,
            None => true,
        };
        if changed {
            log::trace!("scope changed: {} names", current.len());
            self.events.push(Event::Scope { scope: current });
            self.latest_scope = Some(tenv.scope.clone());
        }
    }

    fn infer_expr_inner(&mut self, tenv: &Tenv, expr: &Expr) -> Result<Type, TypeError> {
        match expr {
            Expr::Prim { prim, .. } => Ok(Type::con(prim.type_name())),
            Expr::Str { embeds, .. } => {
                for embed in embeds {
                    let env = tenv_apply(&self.subst, tenv);
                    self.infer_expr(&env, embed)?;
                }
                Ok(t_string())
            }
            Expr::Var { name, .. } => {
                let scheme = tenv
                    .lookup(name)
                    .cloned()
                    .ok_or_else(|| TypeError::UnboundVariable(name.clone()))?;
                Ok(self.instantiate(&scheme))
            }
            Expr::Block { stmts, .. } => self.infer_block(tenv, stmts),
            Expr::Lambda { args, body, src } => self.infer_lambda(tenv, args, body, *src),
            Expr::App { target, args, src } => self.infer_app(tenv, target, args, *src),
            Expr::If { cond, yes, no, src } => {
                self.stack_push(
                    *src,
                    vec![
                        StackText::kwd("if"),
                        StackText::active(),
                        StackText::hole(),
                        StackText::kwd("else"),
                        StackText::hole(),
                    ],
                );
                self.stack_break("'if' expression");
                let cond_t = self.infer_expr(tenv, cond)?;
                self.unify(&cond_t, &t_bool(), cond.src(), "condition", "bool")?;
                let env = tenv_apply(&self.subst, tenv);
                let yes_t = self.infer_expr(&env, yes)?;
                let no_t = match no {
                    Some(no) => {
                        let env = tenv_apply(&self.subst, tenv);
                        self.infer_expr(&env, no)?
                    }
                    None => t_void(),
                };
                // else が無い場合も void と突き合わせる
                self.unify(&yes_t, &no_t, *src, "then branch", "else branch")?;
                self.stack_replace(
                    *src,
                    vec![
                        StackText::kwd("if"),
                        StackText::Type(t_bool()),
                        StackText::Type(self.apply(&yes_t)),
                        StackText::kwd("else"),
                        StackText::Type(self.apply(&no_t)),
                    ],
                );
                self.stack_break("branches agree");
                self.stack_pop();
                Ok(self.apply(&yes_t))
            }
            Expr::Match { target, cases, src } => self.infer_match(tenv, target, cases, *src),
        }
    }

    fn infer_block(&mut self, tenv: &Tenv, stmts: &[Stmt]) -> Result<Type, TypeError> {
        let mut scope = Scope::new();
        let mut last = t_void();
        for stmt in stmts {
            let env = tenv_apply(&self.subst, tenv).with_scope(&scope_apply(&self.subst, &scope));
            let result = self.infer_stmt(&env, stmt)?;
            if let Some(extra) = result.scope {
                scope.extend(extra);
            }
            last = result.value;
        }
        Ok(self.apply(&last))
    }

    fn infer_lambda(
        &mut self,
        tenv: &Tenv,
        args: &[Pat],
        body: &Expr,
        src: Src,
    ) -> Result<Type, TypeError> {
        if args.is_empty() {
            return Err(TypeError::EmptyLambda);
        }
        let ret = self.new_type_var(TvarMeta::LambdaReturn { src });
        let mut scope = Scope::from([("return".to_string(), Scheme::mono(ret.clone()))]);

        let mut line: Vec<StackText> = args.iter().map(|_| StackText::hole()).collect();
        line.push(StackText::kwd("=>"));
        line.push(StackText::hole());
        self.stack_push(src, line);
        self.stack_break("lambda");

        let mut arg_types = Vec::with_capacity(args.len());
        for pat in args {
            let (ty, extra) = self.infer_pattern(tenv, pat)?;
            let extra = scope_apply(&self.subst, &extra);
            arg_types.push(ty.clone());
            scope.extend(extra);
            self.events.push(Event::Infer {
                src: pat.src(),
                value: ty,
            });
        }

        let mut line: Vec<StackText> = arg_types
            .iter()
            .map(|t| StackText::Type(self.apply(t)))
            .collect();
        line.push(StackText::kwd("=>"));
        line.push(StackText::active());
        self.stack_replace(src, line);
        self.stack_break("lambda arguments");

        let body_t = self.infer_expr(&tenv.with_scope(&scope), body)?;
        let ret_t = self.apply(&ret);
        self.unify(&body_t, &ret_t, body.src(), "body", "return type")?;

        let args_t: Vec<Type> = arg_types.iter().map(|t| self.apply(t)).collect();
        let result = Type::func(args_t, self.apply(&body_t));
        self.stack_replace(src, vec![StackText::Type(result.clone())]);
        self.stack_break("lambda type");
        self.stack_pop();
        Ok(result)
    }

    fn infer_app(
        &mut self,
        tenv: &Tenv,
        target: &Expr,
        args: &[Expr],
        src: Src,
    ) -> Result<Type, TypeError> {
        if args.is_empty() {
            return Err(TypeError::EmptyCall);
        }
        let result = self.new_type_var(TvarMeta::ApplyResult { src });
        self.events.push(Event::Infer {
            src,
            value: result.clone(),
        });

        let mut line = vec![StackText::active(), StackText::text("(")];
        line.extend(args.iter().map(|_| StackText::hole()));
        line.push(StackText::text(")"));
        self.stack_push(src, line);
        self.stack_break("function call");

        let target_t = self.infer_expr(tenv, target)?;
        let mut arg_types = Vec::with_capacity(args.len());
        for arg in args {
            let env = tenv_apply(&self.subst, tenv);
            arg_types.push(self.infer_expr(&env, arg)?);
        }

        let mut line = vec![StackText::Type(self.apply(&target_t)), StackText::text("(")];
        line.extend(arg_types.iter().map(|t| StackText::Type(self.apply(t))));
        line.push(StackText::text(")"));
        self.stack_replace(src, line);
        self.stack_break("call arguments");

        let callee = self.apply(&target_t);
        let expected = Type::func(arg_types, result.clone());
        self.unify(&callee, &expected, src, "callee", "call")?;
        self.stack_replace(src, vec![StackText::Type(self.apply(&result))]);
        self.stack_break("call result");
        self.stack_pop();
        Ok(self.apply(&result))
    }

    fn infer_match(
        &mut self,
        tenv: &Tenv,
        target: &Expr,
        cases: &[Case],
        src: Src,
    ) -> Result<Type, TypeError> {
        let target_t = self.infer_expr(tenv, target)?;
        let result = self.new_type_var(TvarMeta::MatchResult { src });
        self.stack_push(
            src,
            vec![
                StackText::kwd("switch"),
                StackText::Type(self.apply(&target_t)),
                StackText::active(),
            ],
        );
        self.stack_break("'switch' expression");
        for case in cases {
            let (pat_t, scope) = self.infer_pattern(tenv, &case.pat)?;
            self.unify(&pat_t, &target_t, case.pat.src(), "pattern", "target")?;
            let scope = scope_apply(&self.subst, &scope);
            let env = tenv_apply(&self.subst, tenv).with_scope(&scope);
            let body_t = self.infer_expr(&env, &case.body)?;
            let expected = self.apply(&result);
            self.unify(&expected, &body_t, case.body.src(), "result", "case body")?;
        }
        self.stack_pop();
        Ok(self.apply(&result))
    }
}
