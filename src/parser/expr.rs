// パス: src/parser/expr.rs
// 役割: 式（リテラル・変数・タプル・配列・ラムダ・if・switch・二項演算・後置要素）の文法規則
// 意図: 演算子や添字などの糖衣をすべて関数適用へ脱糖した AST を組み立てる
// 関連ファイル: src/parser/mod.rs, src/parser/stmt.rs, src/parser/pat.rs

use super::*;
use crate::ast::Prim;
use crate::cst::ListKind;
use crate::dsl::{
    group, id, kwd, kwd_as, list, list_as, number, opt, or, ref_, seq, star, table, text, tx,
    Bindings, Matcher,
};

pub(super) fn rules(grammar: Grammar<Value>) -> Grammar<Value> {
    let bops: Vec<Matcher<Value>> = BINOPS.iter().map(|op| kwd_as(*op, MetaKind::Bop)).collect();
    grammar
        .rule(
            "expr",
            or(vec![
                ref_("expr num", None),
                ref_("expr var", None),
                ref_("expr text", None),
                ref_("expr tuple", None),
                ref_("expr array", None),
                ref_("expr!", None),
                list(ListKind::Spaced, ref_("expr ", None)),
            ]),
        )
        .rule("expr num", tx(group("value", number()), build_num))
        .rule("expr var", tx(group("id", id(Some(MetaKind::Ref))), build_var))
        .rule(
            "expr text",
            tx(group("spans", text(ref_("expr", None))), build_text),
        )
        .rule(
            "expr tuple",
            tx(
                list(ListKind::Round, group("items", star(ref_("expr", None)))),
                build_tuple,
            ),
        )
        .rule(
            "expr array",
            tx(
                list(ListKind::Square, group("items", star(ref_("expr", None)))),
                build_array,
            ),
        )
        .rule("expr!", list(ListKind::Smooshed, ref_("expr..", None)))
        .rule(
            "expr..",
            tx(
                seq(vec![
                    ref_("expr", Some("base")),
                    group(
                        "suffixes",
                        star(or(vec![
                            tx(
                                seq(vec![
                                    kwd_as(".", MetaKind::Punct),
                                    group("attribute", id(Some(MetaKind::Attribute))),
                                ]),
                                build_attribute,
                            ),
                            tx(
                                list(ListKind::Square, ref_("expr", Some("index"))),
                                build_index,
                            ),
                            tx(
                                list(ListKind::Round, group("items", star(ref_("expr", None)))),
                                build_call,
                            ),
                        ])),
                    ),
                ]),
                build_smoosh,
            ),
        )
        .rule("bop", or(bops))
        .rule(
            "expr ",
            or(vec![
                tx(
                    seq(vec![
                        list_as(
                            ListKind::Round,
                            group("args", star(ref_("pat", None))),
                            MetaKind::FnArgs,
                        ),
                        kwd_as("=>", MetaKind::Punct),
                        group("body", or(vec![ref_("block", None), ref_("expr ", None)])),
                    ]),
                    build_lambda,
                ),
                tx(
                    seq(vec![
                        kwd("switch"),
                        list(ListKind::Round, ref_("expr", Some("target"))),
                        group(
                            "cases",
                            table(
                                ListKind::Curly,
                                tx(
                                    seq(vec![ref_("pat", Some("pat")), ref_("stmt", Some("body"))]),
                                    build_case,
                                ),
                            ),
                        ),
                    ]),
                    build_switch,
                ),
                ref_("if", None),
                tx(
                    seq(vec![
                        ref_("expr", Some("first")),
                        group(
                            "rest",
                            star(seq(vec![ref_("bop", None), ref_("expr", None)])),
                        ),
                    ]),
                    build_binops,
                ),
            ]),
        )
        .rule(
            "if",
            tx(
                seq(vec![
                    kwd("if"),
                    list(ListKind::Round, ref_("expr", Some("cond"))),
                    ref_("block", Some("yes")),
                    opt(seq(vec![
                        kwd("else"),
                        group("no", or(vec![ref_("if", None), ref_("block", None)])),
                    ])),
                ]),
                build_if,
            ),
        )
}

fn build_num(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let Value::Number(value, _) = b.take("value")? else {
        return None;
    };
    Some(Value::expr(Expr::Prim {
        prim: Prim::Int(value),
        src,
    }))
}

fn build_var(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let id = b.take("id")?.into_id()?;
    Some(Value::expr(Expr::var(id.text, src)))
}

fn build_text(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let Value::Text(spans, _) = b.take("spans")? else {
        return None;
    };
    let mut value = String::new();
    let mut embeds = Vec::new();
    for span in spans {
        match span {
            TextSpan::Text { text } => value.push_str(&text),
            TextSpan::Embed { item } => embeds.push(item.into_expr()?),
        }
    }
    Some(Value::expr(Expr::Str { value, embeds, src }))
}

/// `()` は `null`、要素 1 つはその要素、2 つ以上は `,` の右畳み込み。
fn build_tuple(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let mut items = many_exprs(b.take("items")?)?;
    let expr = match items.len() {
        0 => Expr::var("null", src),
        1 => items.pop()?,
        _ => {
            let last = items.pop()?;
            items.into_iter().rev().fold(last, |right, left| {
                Expr::app(Expr::var(",", src), vec![left, right], src)
            })
        }
    };
    Some(Value::expr(expr))
}

/// `[a, b]` は `::(a, ::(b, []))`。
fn build_array(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let items = many_exprs(b.take("items")?)?;
    let expr = items
        .into_iter()
        .rev()
        .fold(Expr::var("[]", src), |tail, head| {
            Expr::app(Expr::var("::", src), vec![head, tail], src)
        });
    Some(Value::expr(expr))
}

fn build_attribute(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let attribute = b.take("attribute")?.into_id()?;
    Some(Value::suffix(Suffix::Attribute(attribute, src)))
}

fn build_index(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let index = b.take("index")?.into_expr()?;
    Some(Value::suffix(Suffix::Index(index, src)))
}

fn build_call(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let items = many_exprs(b.take("items")?)?;
    Some(Value::suffix(Suffix::Call(items, src)))
}

fn build_smoosh(b: &mut Bindings<Value>, _: Src) -> Option<Value> {
    let base = b.take("base")?.into_expr()?;
    let suffixes = b
        .take("suffixes")?
        .into_many()?
        .into_iter()
        .map(|v| match v {
            Value::Suffix(s) => Some(*s),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(Value::expr(apply_suffixes(base, suffixes)))
}

/// 後置要素を左から順に適用する。`t.name(a…)` は `name(t, a…)`。
pub(super) fn apply_suffixes(base: Expr, suffixes: Vec<Suffix>) -> Expr {
    let mut target = base;
    let mut iter = suffixes.into_iter().peekable();
    while let Some(suffix) = iter.next() {
        target = match suffix {
            Suffix::Attribute(name, attr_src) => {
                let method = Expr::var(name.text, Src::at(name.loc));
                match iter.next_if(|next| matches!(next, Suffix::Call(..))) {
                    Some(Suffix::Call(args, call_src)) => {
                        let src = target.src().merge(call_src);
                        let mut all = Vec::with_capacity(args.len() + 1);
                        all.push(target);
                        all.extend(args);
                        Expr::app(method, all, src)
                    }
                    _ => {
                        let src = target.src().merge(attr_src);
                        Expr::app(method, vec![target], src)
                    }
                }
            }
            Suffix::Index(index, index_src) => {
                let src = target.src().merge(index_src);
                Expr::app(Expr::var("index", index_src), vec![target, index], src)
            }
            Suffix::Call(args, call_src) => {
                let src = target.src().merge(call_src);
                Expr::app(target, args, src)
            }
        };
    }
    target
}

fn build_lambda(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let args = many_pats(b.take("args")?)?;
    let body = b.take("body")?.into_expr()?;
    Some(Value::expr(Expr::Lambda {
        args,
        body: Box::new(body),
        src,
    }))
}

fn build_case(b: &mut Bindings<Value>, _: Src) -> Option<Value> {
    let pat = b.take("pat")?.into_pat()?;
    let body = b.take("body")?.into_body()?;
    Some(Value::case(Case { pat, body }))
}

fn build_switch(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let target = b.take("target")?.into_expr()?;
    let cases = b
        .take("cases")?
        .into_many()?
        .into_iter()
        .map(|v| match v {
            Value::Case(c) => Some(*c),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(Value::expr(Expr::Match {
        target: Box::new(target),
        cases,
        src,
    }))
}

fn build_if(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let cond = b.take("cond")?.into_expr()?;
    let yes = b.take("yes")?.into_expr()?;
    let no = match b.take("no") {
        Some(v) => Some(Box::new(v.into_expr()?)),
        None => None,
    };
    Some(Value::expr(Expr::If {
        cond: Box::new(cond),
        yes: Box::new(yes),
        no,
        src,
    }))
}

fn build_binops(b: &mut Bindings<Value>, _: Src) -> Option<Value> {
    let first = b.take("first")?.into_expr()?;
    let mut rest = Vec::new();
    for pair in b.take("rest")?.into_many()? {
        let mut items = pair.into_many()?.into_iter();
        let op = items.next()?.into_id()?;
        let rhs = items.next()?.into_expr()?;
        rest.push((op, rhs));
    }
    climb(first, rest).map(Value::expr)
}

/// 優先順位表に従って演算子列を木に組み立てる（操車場法）。
pub(super) fn climb(first: Expr, rest: Vec<(IdTok, Expr)>) -> Option<Expr> {
    let mut operands = vec![first];
    let mut ops: Vec<IdTok> = Vec::new();
    for (op, rhs) in rest {
        let (level, _) = infix_level(&op.text)?;
        while let Some(top) = ops.last() {
            let (top_level, top_assoc) = infix_level(&top.text)?;
            if top_level > level || (top_level == level && top_assoc == Assoc::Left) {
                reduce(&mut operands, &mut ops)?;
            } else {
                break;
            }
        }
        ops.push(op);
        operands.push(rhs);
    }
    while !ops.is_empty() {
        reduce(&mut operands, &mut ops)?;
    }
    operands.pop()
}

fn reduce(operands: &mut Vec<Expr>, ops: &mut Vec<IdTok>) -> Option<()> {
    let op = ops.pop()?;
    let right = operands.pop()?;
    let left = operands.pop()?;
    let src = left.src().merge(right.src());
    operands.push(Expr::app(
        Expr::var(op.text, Src::at(op.loc)),
        vec![left, right],
        src,
    ));
    Some(())
}
