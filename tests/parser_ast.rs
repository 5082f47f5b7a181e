// パス: tests/parser_ast.rs
// 役割: 文法規則から得られる AST（脱糖後の表示形式）とメタデータを検証する
// 意図: 演算子の優先順位・後置要素の脱糖・パターン構文の退行を防ぐ
// 関連ファイル: src/parser/mod.rs, src/parser/expr.rs, src/parser/pat.rs, src/ast.rs
#[path = "test_support.rs"]
mod support;

use algw::ast::{Expr, Pat, Stmt};
use algw::dsl::{MetaKind, DEFAULT_MAX_NESTING};
use algw::errors::ParseError;
use support::{find_id, find_ids, parse_display, parse_err, parse_ok};

#[test]
/// 脱糖後の表示形式をテーブルで検証する。
fn desugared_display() {
    struct Case<'a> {
        src: &'a str,
        expected: &'a str,
        note: &'a str,
    }
    let cases = [
        Case {
            src: "10",
            expected: "10",
            note: "整数",
        },
        Case {
            src: "\"hi\"",
            expected: "\"hi\"",
            note: "文字列",
        },
        Case {
            src: "a + b * c",
            expected: "+(a, *(b, c))",
            note: "乗算が優先",
        },
        Case {
            src: "a - b - c",
            expected: "-(-(a, b), c)",
            note: "左結合",
        },
        Case {
            src: "a = b = c",
            expected: "=(a, =(b, c))",
            note: "代入は右結合",
        },
        Case {
            src: "2 ^ 3 ^ 4",
            expected: "^(2, ^(3, 4))",
            note: "累乗は右結合",
        },
        Case {
            src: "a < b + 1",
            expected: "<(a, +(b, 1))",
            note: "比較は加算より弱い",
        },
        Case {
            src: "arr[0]",
            expected: "index(arr, 0)",
            note: "添字",
        },
        Case {
            src: "arr.length",
            expected: "length(arr)",
            note: "属性",
        },
        Case {
            src: "ok.push(1)",
            expected: "push(ok, 1)",
            note: "メソッド呼び出し",
        },
        Case {
            src: "a.b.c",
            expected: "c(b(a))",
            note: "属性の連鎖",
        },
        Case {
            src: "f(1, 2)",
            expected: "f(1, 2)",
            note: "呼び出し",
        },
        Case {
            src: "f(1)(2)",
            expected: "f(1)(2)",
            note: "連続呼び出し",
        },
        Case {
            src: "(1, 2, 3)",
            expected: ",(1, ,(2, 3))",
            note: "タプルは右畳み込み",
        },
        Case {
            src: "(5)",
            expected: "5",
            note: "括弧",
        },
        Case {
            src: "()",
            expected: "null",
            note: "空タプル",
        },
        Case {
            src: "[1, 2]",
            expected: "::(1, ::(2, []))",
            note: "配列",
        },
        Case {
            src: "(x) => x + 1",
            expected: "(x) => +(x, 1)",
            note: "ラムダ",
        },
        Case {
            src: "(a, b) => {a}",
            expected: "(a, b) => {a}",
            note: "ブロック本体のラムダ",
        },
        Case {
            src: "{let x = 10; x}",
            expected: "{let x = 10; x}",
            note: "ブロック",
        },
        Case {
            src: "let (a, _) = x",
            expected: "let (a, _) = x",
            note: "タプルパターン",
        },
        Case {
            src: "let Foo(a, b) = x",
            expected: "let Foo(a, b) = x",
            note: "コンストラクタパターン",
        },
        Case {
            src: "let () = x",
            expected: "let () = x",
            note: "null パターン",
        },
        Case {
            src: "if (a) {1} else if (b) {2} else {3}",
            expected: "if (a) {1} else if (b) {2} else {3}",
            note: "else if",
        },
        Case {
            src: "switch (x) {: 1: true; _: false :}",
            expected: "switch (x) {1: true; _: false}",
            note: "switch",
        },
        Case {
            src: "return",
            expected: "return",
            note: "値なし return",
        },
        Case {
            src: "return a + 1",
            expected: "return +(a, 1)",
            note: "return",
        },
        Case {
            src: "for (let i = 0; i < 3; i += 1) {i}",
            expected: "for (let i = 0; <(i, 3); +=(i, 1)) {i}",
            note: "for",
        },
    ];
    for case in cases {
        assert_eq!(
            parse_display(case.src),
            case.expected,
            "{}: {}",
            case.note,
            case.src
        );
    }
}

#[test]
/// let 文の各部分に分類が付く。
fn let_metadata() {
    let (stmt, meta, cst) = parse_ok("let x = y");
    assert!(matches!(stmt, Stmt::Let { pat: Pat::Var { .. }, .. }));
    let kind = |text: &str| meta.get(&find_id(&cst, text)).map(|m| m.kind);
    assert_eq!(kind("let"), Some(MetaKind::Kwd));
    assert_eq!(kind("x"), Some(MetaKind::Decl));
    assert_eq!(kind("="), Some(MetaKind::Punct));
    assert_eq!(kind("y"), Some(MetaKind::Ref));
}

#[test]
/// ラムダ引数リストと本体の参照。
fn lambda_metadata() {
    let (stmt, meta, cst) = parse_ok("(a) => a");
    let Stmt::Expr {
        expr: Expr::Lambda { args, .. },
        ..
    } = &stmt
    else {
        panic!("lambda expected: {stmt}");
    };
    assert_eq!(args.len(), 1);
    let uses = find_ids(&cst, "a");
    assert_eq!(meta.get(&uses[0]).map(|m| m.kind), Some(MetaKind::Decl));
    assert_eq!(meta.get(&uses[1]).map(|m| m.kind), Some(MetaKind::Ref));
    assert_eq!(
        meta.get(&find_id(&cst, "=>")).map(|m| m.kind),
        Some(MetaKind::Punct)
    );
    assert!(meta.values().any(|m| m.kind == MetaKind::FnArgs));
}

#[test]
/// 演算子と属性の分類。
fn operator_and_attribute_metadata() {
    let (_, meta, cst) = parse_ok("a + b");
    assert_eq!(
        meta.get(&find_id(&cst, "+")).map(|m| m.kind),
        Some(MetaKind::Bop)
    );
    let (_, meta, cst) = parse_ok("arr.length");
    assert_eq!(
        meta.get(&find_id(&cst, ".")).map(|m| m.kind),
        Some(MetaKind::Punct)
    );
    assert_eq!(
        meta.get(&find_id(&cst, "length")).map(|m| m.kind),
        Some(MetaKind::Attribute)
    );
}

#[test]
/// 解析失敗の分類。
fn parse_failures() {
    assert_eq!(parse_err(""), ParseError::EmptyInput);
    assert!(matches!(parse_err("let = 5"), ParseError::NoMatch { .. }));
    match parse_err("a b") {
        ParseError::Unparsed { locs } => assert_eq!(locs.len(), 1),
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(parse_err("a b").code(), "PAR002");
}

#[test]
/// i64 に収まらない数字列は変数名にもならず照合に失敗する。
fn overflowing_number_is_not_a_name() {
    assert!(matches!(
        parse_err("99999999999999999999999"),
        ParseError::NoMatch { .. }
    ));
    assert!(matches!(
        parse_err("1 + 99999999999999999999999"),
        ParseError::NoMatch { .. } | ParseError::Unparsed { .. }
    ));
}

#[test]
/// 入れ子が上限を超える入力は照合せずに TooDeep を返す。
fn deep_nesting_is_rejected() {
    for (open, close) in [("{", "}"), ("(", ")"), ("[", "]")] {
        let src = format!("{}1{}", open.repeat(40), close.repeat(40));
        match parse_err(&src) {
            ParseError::TooDeep { depth, limit, .. } => {
                assert_eq!(limit, DEFAULT_MAX_NESTING);
                assert!(depth > limit, "{src}");
            }
            other => panic!("unexpected for {src}: {other:?}"),
        }
    }
    let src = format!("{}1{}", "{".repeat(20), "}".repeat(20));
    assert!(matches!(parse_err(&src), ParseError::TooDeep { .. }));
    assert_eq!(parse_err(&src).code(), "PAR003");
}

#[test]
/// 上限内の入れ子は通常どおり解析される。
fn nesting_within_limit_parses() {
    let src = format!("{}1{}", "(".repeat(15), ")".repeat(15));
    assert_eq!(parse_display(&src), "1");
    let src = format!("{}1{}", "{".repeat(15), "}".repeat(15));
    assert!(parse_ok(&src).0.to_string().contains('1'));
}

#[test]
/// 埋め込み付き文字列は式として埋め込みを保持する。
fn text_embeds_are_expressions() {
    let (stmt, _, _) = parse_ok("\"n=${n + 1}\"");
    let Stmt::Expr {
        expr: Expr::Str { value, embeds, .. },
        ..
    } = stmt
    else {
        panic!("string expected");
    };
    assert_eq!(value, "n=");
    assert_eq!(embeds.len(), 1);
    assert_eq!(embeds[0].to_string(), "+(n, 1)");
}
