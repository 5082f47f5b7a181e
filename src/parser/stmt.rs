// パス: src/parser/stmt.rs
// 役割: 文（let / return / for / 式文）とブロックの文法規則を定義する
// 意図: 空白区切りリストの先頭キーワードで文の種類を振り分ける
// 関連ファイル: src/parser/mod.rs, src/parser/expr.rs, src/ast.rs

use super::*;
use crate::cst::ListKind;
use crate::dsl::{group, kwd, kwd_as, list, or, ref_, seq, star, tx, Bindings};

pub(super) fn rules(grammar: Grammar<Value>) -> Grammar<Value> {
    grammar
        .rule(
            "stmt",
            or(vec![
                list(
                    ListKind::Spaced,
                    or(vec![
                        ref_("let", None),
                        ref_("return", None),
                        ref_("for", None),
                    ]),
                ),
                tx(kwd("return"), build_bare_return),
                ref_("block", None),
                tx(ref_("expr", Some("expr")), build_expr_stmt),
            ]),
        )
        .rule(
            "let",
            tx(
                seq(vec![
                    kwd("let"),
                    ref_("pat", Some("pat")),
                    kwd_as("=", MetaKind::Punct),
                    ref_("expr ", Some("value")),
                ]),
                build_let,
            ),
        )
        .rule(
            "return",
            tx(
                seq(vec![kwd("return"), ref_("expr ", Some("value"))]),
                build_return,
            ),
        )
        .rule(
            "for",
            tx(
                seq(vec![
                    kwd("for"),
                    list(
                        ListKind::Round,
                        seq(vec![
                            ref_("stmt", Some("init")),
                            ref_("expr", Some("cond")),
                            ref_("expr", Some("update")),
                        ]),
                    ),
                    ref_("block", Some("body")),
                ]),
                build_for,
            ),
        )
        .rule(
            "block",
            tx(
                list(ListKind::Curly, group("contents", star(ref_("stmt", None)))),
                build_block,
            ),
        )
}

fn build_bare_return(_: &mut Bindings<Value>, src: Src) -> Option<Value> {
    Some(Value::stmt(Stmt::Return { value: None, src }))
}

fn build_expr_stmt(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let expr = b.take("expr")?.into_expr()?;
    Some(Value::stmt(Stmt::Expr { expr, src }))
}

fn build_let(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let pat = b.take("pat")?.into_pat()?;
    let init = b.take("value")?.into_expr()?;
    Some(Value::stmt(Stmt::Let { pat, init, src }))
}

fn build_return(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let value = b.take("value")?.into_expr()?;
    Some(Value::stmt(Stmt::Return {
        value: Some(value),
        src,
    }))
}

fn build_for(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let init = b.take("init")?.into_stmt()?;
    let cond = b.take("cond")?.into_expr()?;
    let update = b.take("update")?.into_expr()?;
    let body = b.take("body")?.into_expr()?;
    Some(Value::stmt(Stmt::For {
        init: Box::new(init),
        cond,
        update,
        body: Box::new(body),
        src,
    }))
}

fn build_block(b: &mut Bindings<Value>, src: Src) -> Option<Value> {
    let stmts = b
        .take("contents")?
        .into_many()?
        .into_iter()
        .map(Value::into_stmt)
        .collect::<Option<Vec<_>>>()?;
    Some(Value::expr(Expr::Block { stmts, src }))
}
