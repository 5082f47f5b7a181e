// パス: src/typesys.rs
// 役割: 型・型スキーム・置換・型環境の表現と、その代数（適用・合成・一般化・単一化）
// 意図: 推論器から副作用を切り離した純粋な操作として提供し、単体で検証できるようにする
// 関連ファイル: src/infer/mod.rs, src/builtins.rs, tests/typesys_algebra.rs
//! 型システム（typesys）
//!
//! 目的:
//! - 型表現（`Type`）とスキーム（`Scheme`）、置換（`Subst`）、型環境（`Tenv`）を定義する。
//! - 自由変数・置換適用・合成・一般化・単一化といった基礎操作を提供する。
//!
//! 不変条件:
//! - `Fn`/`App` の `args` は空にならない。
//! - `compose_subst` の結果では、定義域の名前が値域の型に自由出現しない。

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::errors::TypeError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
/// 型システムで利用する型バリアント。
pub enum Type {
    Var { name: String },
    Con { name: String },
    Fn { args: Vec<Type>, result: Box<Type> },
    App { target: Box<Type>, args: Vec<Type> },
}

impl Type {
    pub fn var(name: impl Into<String>) -> Self {
        Type::Var { name: name.into() }
    }

    pub fn con(name: impl Into<String>) -> Self {
        Type::Con { name: name.into() }
    }

    /// n 引数の関数型。
    pub fn func(args: Vec<Type>, result: Type) -> Self {
        Type::Fn {
            args,
            result: Box::new(result),
        }
    }

    pub fn app(target: Type, args: Vec<Type>) -> Self {
        Type::App {
            target: Box::new(target),
            args,
        }
    }

    /// 型変数なら名前を返す。
    pub fn var_name(&self) -> Option<&str> {
        match self {
            Type::Var { name } => Some(name),
            _ => None,
        }
    }
}

pub fn t_int() -> Type {
    Type::con("int")
}
pub fn t_bool() -> Type {
    Type::con("bool")
}
pub fn t_string() -> Type {
    Type::con("string")
}
pub fn t_void() -> Type {
    Type::con("void")
}
pub fn t_null() -> Type {
    Type::con("null")
}

/// `Array(elem)` を構築する。
pub fn t_array(elem: Type) -> Type {
    Type::app(Type::con("Array"), vec![elem])
}

/// 2 要素タプル `,(a, b)` を構築する。
pub fn t_pair(a: Type, b: Type) -> Type {
    Type::app(Type::con(","), vec![a, b])
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
/// 全称型変数を含む型スキーム。
pub struct Scheme {
    pub vars: Vec<String>,
    pub body: Type,
}

impl Scheme {
    /// 量化変数を持たないスキーム。
    pub fn mono(body: Type) -> Self {
        Self {
            vars: Vec::new(),
            body,
        }
    }

    pub fn poly(vars: &[&str], body: Type) -> Self {
        Self {
            vars: vars.iter().map(|v| v.to_string()).collect(),
            body,
        }
    }
}

// 置換
pub type Subst = BTreeMap<String, Type>;

/// 名前から型スキームへの束縛。
pub type Scope = BTreeMap<String, Scheme>;

/// パターンで使えるコンストラクタの宣言。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Constructor {
    pub free: Vec<String>,
    pub args: Vec<Type>,
    pub result: Type,
}

/// 型の宣言（引数の数と所属コンストラクタ）。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TypeDef {
    pub free: usize,
    pub constructors: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Alias {
    pub args: Vec<String>,
    pub body: Type,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
/// 推論時に参照する型環境。
pub struct Tenv {
    pub scope: Scope,
    pub constructors: BTreeMap<String, Constructor>,
    pub types: BTreeMap<String, TypeDef>,
    pub aliases: BTreeMap<String, Alias>,
}

impl Tenv {
    pub fn new() -> Self {
        Self::default()
    }

    /// `extra` の束縛で上書きした環境を返す。
    pub fn with_scope(&self, extra: &Scope) -> Tenv {
        let mut next = self.clone();
        for (name, scheme) in extra {
            next.scope.insert(name.clone(), scheme.clone());
        }
        next
    }

    pub fn lookup(&self, name: &str) -> Option<&Scheme> {
        self.scope.get(name)
    }
}

/// 出現順を保ったまま重複を除いて連結する。
pub fn merge_names(lists: Vec<Vec<String>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in lists.into_iter().flatten() {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

/// 型に含まれる自由型変数を出現順に求める。
pub fn type_free(t: &Type) -> Vec<String> {
    match t {
        Type::Var { name } => vec![name.clone()],
        Type::Con { .. } => Vec::new(),
        Type::App { target, args } => {
            let mut lists = vec![type_free(target)];
            lists.extend(args.iter().map(type_free));
            merge_names(lists)
        }
        Type::Fn { args, result } => {
            let mut lists = vec![type_free(result)];
            lists.extend(args.iter().map(type_free));
            merge_names(lists)
        }
    }
}

pub fn scheme_free(scheme: &Scheme) -> Vec<String> {
    type_free(&scheme.body)
        .into_iter()
        .filter(|n| !scheme.vars.contains(n))
        .collect()
}

/// 型環境のスコープに自由出現する型変数。
pub fn tenv_free(tenv: &Tenv) -> Vec<String> {
    merge_names(tenv.scope.values().map(scheme_free).collect())
}

/// 型に置換を適用する。
pub fn type_apply(s: &Subst, t: &Type) -> Type {
    match t {
        Type::Var { name } => s.get(name).cloned().unwrap_or_else(|| t.clone()),
        Type::Con { .. } => t.clone(),
        Type::App { target, args } => Type::App {
            target: Box::new(type_apply(s, target)),
            args: args.iter().map(|a| type_apply(s, a)).collect(),
        },
        Type::Fn { args, result } => Type::Fn {
            args: args.iter().map(|a| type_apply(s, a)).collect(),
            result: Box::new(type_apply(s, result)),
        },
    }
}

/// `names` に含まれるキーを除いた写像。
pub fn map_without<T: Clone>(map: &BTreeMap<String, T>, names: &[String]) -> BTreeMap<String, T> {
    map.iter()
        .filter(|(k, _)| !names.contains(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// 量化変数を避けてスキームに置換を適用する。
pub fn scheme_apply(s: &Subst, scheme: &Scheme) -> Scheme {
    Scheme {
        vars: scheme.vars.clone(),
        body: type_apply(&map_without(s, &scheme.vars), &scheme.body),
    }
}

pub fn scope_apply(s: &Subst, scope: &Scope) -> Scope {
    scope
        .iter()
        .map(|(k, v)| (k.clone(), scheme_apply(s, v)))
        .collect()
}

pub fn tenv_apply(s: &Subst, tenv: &Tenv) -> Tenv {
    Tenv {
        scope: scope_apply(s, &tenv.scope),
        ..tenv.clone()
    }
}

/// 2つの置換を合成する（先に `old`、次に `new`）。
///
/// `new` が `old` の定義域の名前を再定義しようとした場合は失敗する。
pub fn compose_subst(new: &Subst, old: &Subst) -> Result<Subst, TypeError> {
    if let Some(name) = new.keys().find(|k| old.contains_key(*k)) {
        return Err(TypeError::SubstitutionOverwrite(name.clone()));
    }
    let mut out: Subst = old
        .iter()
        .map(|(k, v)| (k.clone(), type_apply(new, v)))
        .collect();
    for (k, v) in new {
        out.insert(k.clone(), v.clone());
    }
    Ok(out)
}

/// 環境に自由出現しない型変数を量化してスキームを作る。
pub fn generalize(tenv: &Tenv, t: &Type) -> Scheme {
    let free = tenv_free(tenv);
    Scheme {
        vars: type_free(t)
            .into_iter()
            .filter(|n| !free.contains(n))
            .collect(),
        body: t.clone(),
    }
}

/// 型変数と型を結び付けて置換とする。
pub fn var_bind(name: &str, t: &Type) -> Result<Subst, TypeError> {
    if let Type::Var { name: other } = t {
        if other == name {
            return Ok(Subst::new());
        }
        return Ok(Subst::from([(name.to_string(), t.clone())]));
    }
    if type_free(t).iter().any(|n| n == name) {
        return Err(TypeError::OccursCheck(name.to_string(), t.clone()));
    }
    Ok(Subst::from([(name.to_string(), t.clone())]))
}

/// 2つの型を突き合わせて最小の置換（差分）を得る。
///
/// 関数型は結果型を先に、次に引数を左から順に単一化する。
pub fn unify_types(one: &Type, two: &Type) -> Result<Subst, TypeError> {
    match (one, two) {
        (Type::Var { name }, _) => var_bind(name, two),
        (_, Type::Var { name }) => var_bind(name, one),
        (Type::Con { name: a }, Type::Con { name: b }) => {
            if a == b {
                Ok(Subst::new())
            } else {
                Err(TypeError::IncompatibleTypes(one.clone(), two.clone()))
            }
        }
        (
            Type::Fn {
                args: a_args,
                result: a_res,
            },
            Type::Fn {
                args: b_args,
                result: b_res,
            },
        ) => {
            if a_args.len() != b_args.len() {
                return Err(TypeError::ArityMismatch {
                    expected: a_args.len(),
                    found: b_args.len(),
                });
            }
            let subst = unify_types(a_res, b_res)?;
            unify_pairs(subst, a_args, b_args)
        }
        (
            Type::App {
                target: a_target,
                args: a_args,
            },
            Type::App {
                target: b_target,
                args: b_args,
            },
        ) => {
            if a_args.len() != b_args.len() {
                return Err(TypeError::ArityMismatch {
                    expected: a_args.len(),
                    found: b_args.len(),
                });
            }
            let subst = unify_types(a_target, b_target)?;
            unify_pairs(subst, a_args, b_args)
        }
        _ => Err(TypeError::IncompatibleTypes(one.clone(), two.clone())),
    }
}

fn unify_pairs(mut subst: Subst, left: &[Type], right: &[Type]) -> Result<Subst, TypeError> {
    for (a, b) in left.iter().zip(right) {
        let step = unify_types(&type_apply(&subst, a), &type_apply(&subst, b))?;
        subst = compose_subst(&step, &subst)?;
    }
    Ok(subst)
}

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// 連番から型変数名を作る（a..z, ba, bb, ...）。
pub fn make_name(mut n: usize) -> String {
    let base = ALPHABET.len();
    let mut out = Vec::new();
    while n >= base {
        out.push(ALPHABET[n % base]);
        n /= base;
    }
    out.push(ALPHABET[n]);
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// 表示順（関数は引数が先）に型変数を a, b, ... へ振り直す。
///
/// 型変数名は推論の手順に依存するため、結果の比較や表示に使う。
pub fn normalize_vars(t: &Type) -> Type {
    fn collect(t: &Type, out: &mut Vec<String>) {
        match t {
            Type::Var { name } => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Type::Con { .. } => {}
            Type::App { target, args } => {
                collect(target, out);
                args.iter().for_each(|a| collect(a, out));
            }
            Type::Fn { args, result } => {
                args.iter().for_each(|a| collect(a, out));
                collect(result, out);
            }
        }
    }
    let mut names = Vec::new();
    collect(t, &mut names);
    let renaming: Subst = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name, Type::var(make_name(i))))
        .collect();
    type_apply(&renaming, t)
}

/// 型を表示用の文字列にする。`,` の適用はタプル表記。
pub fn type_to_string(t: &Type) -> String {
    t.to_string()
}

fn join_types(args: &[Type]) -> String {
    args.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Var { name } | Type::Con { name } => f.write_str(name),
            Type::App { target, args } => match target.as_ref() {
                Type::Con { name } if name == "," => write!(f, "({})", join_types(args)),
                _ => write!(f, "{}({})", target, join_types(args)),
            },
            Type::Fn { args, result } => write!(f, "({}) => {}", join_types(args), result),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.vars.is_empty() {
            write!(f, "{}", self.body)
        } else {
            write!(f, "forall {}. {}", self.vars.join(" "), self.body)
        }
    }
}
