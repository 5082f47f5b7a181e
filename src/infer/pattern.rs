// パス: src/infer/pattern.rs
// 役割: パターンの型とパターンが導入する束縛を求める
// 意図: コンストラクタパターンの型引数をインスタンス化し、部分パターンを順に単一化する
// 関連ファイル: src/infer/mod.rs, src/builtins.rs

use super::InferCtx;
use crate::ast::Pat;
use crate::errors::TypeError;
use crate::events::TvarMeta;
use crate::typesys::{t_string, type_apply, Scheme, Scope, Tenv, Type};

impl InferCtx {
    /// パターンの型と、パターン変数の束縛を返す。
    pub fn infer_pattern(&mut self, tenv: &Tenv, pat: &Pat) -> Result<(Type, Scope), TypeError> {
        match pat {
            Pat::Any { src } => Ok((
                self.new_type_var(TvarMeta::PatAny { src: *src }),
                Scope::new(),
            )),
            Pat::Var { name, src } => {
                let v = self.new_type_var(TvarMeta::PatVar {
                    name: name.clone(),
                    src: *src,
                });
                let scope = Scope::from([(name.clone(), Scheme::mono(v.clone()))]);
                Ok((v, scope))
            }
            Pat::Prim { prim, .. } => Ok((Type::con(prim.type_name()), Scope::new())),
            Pat::Str { .. } => Ok((t_string(), Scope::new())),
            Pat::Con { name, args, .. } => {
                let con = tenv
                    .constructors
                    .get(name)
                    .cloned()
                    .ok_or_else(|| TypeError::UnknownConstructor(name.clone()))?;
                if con.args.len() != args.len() {
                    return Err(TypeError::ArityMismatch {
                        expected: con.args.len(),
                        found: args.len(),
                    });
                }
                let fresh = self.subst_for_free(&con.free);
                let mut scope = Scope::new();
                for (sub, declared) in args.iter().zip(&con.args) {
                    let (ty, extra) = self.infer_pattern(tenv, sub)?;
                    let declared = type_apply(&fresh, declared);
                    self.unify(&ty, &declared, sub.src(), "pattern", "constructor argument")?;
                    scope.extend(extra);
                }
                Ok((self.apply(&type_apply(&fresh, &con.result)), scope))
            }
        }
    }
}
