// パス: src/parser/pat.rs
// 役割: パターン（_ / 整数 / 真偽値 / 文字列 / 変数 / コンストラクタ / タプル）の文法規則
// 意図: let とラムダ引数、switch の各ケースで共通のパターン表現を組み立てる
// 関連ファイル: src/parser/mod.rs, src/parser/expr.rs, src/ast.rs

use super::*;
use crate::ast::Prim;
use crate::cst::ListKind;
use crate::dsl::{any, group, id, kwd, list, number, or, ref_, seq, star, text, tx, Bindings};

pub(super) fn rules(grammar: Grammar<Value>) -> Grammar<Value> {
    grammar.rule(
        "pat",
        or(vec![
            tx(kwd("_"), build_any),
            tx(group("value", number()), build_int),
            tx(group("value", or(vec![kwd("true"), kwd("false")])), build_bool),
            tx(group("value", text(any())), build_str),
            tx(group("id", id(Some(MetaKind::Decl))), build_var),
            tx(
                list(
                    ListKind::Smooshed,
                    seq(vec![
                        group("name", id(Some(MetaKind::Ref))),
                        list(ListKind::Round, group("args", star(ref_("pat", None)))),
                    ]),
                ),
                build_con,
            ),
            tx(
                list(ListKind::Round, group("items", star(ref_("pat", None)))),
                build_tuple,
            ),
        ]),
    )
}

fn build_any(_: &mut Bindings<Value>, src: Src) -> Option<Value> {
    Some(Value::pat(Pat::Any { src }))
}

fn build_int(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let Value::Number(value, _) = b.take("value")? else {
        return None;
    };
    Some(Value::pat(Pat::Prim {
        prim: Prim::Int(value),
        src,
    }))
}

fn build_bool(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let id = b.take("value")?.into_id()?;
    Some(Value::pat(Pat::Prim {
        prim: Prim::Bool(id.text == "true"),
        src,
    }))
}

/// 埋め込みを含む文字列はパターンにできない。
fn build_str(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let Value::Text(spans, _) = b.take("value")? else {
        return None;
    };
    let mut value = String::new();
    for span in spans {
        match span {
            TextSpan::Text { text } => value.push_str(&text),
            TextSpan::Embed { .. } => return None,
        }
    }
    Some(Value::pat(Pat::Str { value, src }))
}

fn build_var(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let id = b.take("id")?.into_id()?;
    Some(Value::pat(Pat::Var { name: id.text, src }))
}

fn build_con(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let name = b.take("name")?.into_id()?;
    let args = many_pats(b.take("args")?)?;
    Some(Value::pat(Pat::Con {
        name: name.text,
        args,
        src,
    }))
}

/// `()` は引数なしの `null` コンストラクタ、2 要素以上は `,` の右畳み込み。
fn build_tuple(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let mut items = many_pats(b.take("items")?)?;
    let pat = match items.len() {
        0 => Pat::Con {
            name: "null".into(),
            args: Vec::new(),
            src,
        },
        1 => items.pop()?,
        _ => {
            let last = items.pop()?;
            items.into_iter().rev().fold(last, |right, left| Pat::Con {
                name: ",".into(),
                args: vec![left, right],
                src,
            })
        }
    };
    Some(Value::pat(pat))
}
