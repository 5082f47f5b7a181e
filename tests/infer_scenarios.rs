// パス: tests/infer_scenarios.rs
// 役割: ソース文字列から推論結果の型（正規化済みの表示）までを端から端まで検証する
// 意図: let 多相・パターン・return・配列操作など代表的なプログラムの主要型を固定する
// 関連ファイル: src/pipeline.rs, src/infer/mod.rs, src/builtins.rs, tests/test_support.rs
#[path = "test_support.rs"]
mod support;

use algw::errors::TypeError;
use algw::typesys::{t_bool, t_int, t_void};
use support::{infer_display, infer_error};

#[test]
/// 成功する推論の型をテーブルで検証する。
fn inferred_types() {
    struct Case<'a> {
        src: &'a str,
        expected: &'a str,
        note: &'a str,
    }
    let cases = [
        Case {
            src: "10",
            expected: "int",
            note: "整数",
        },
        Case {
            src: "\"hi\"",
            expected: "string",
            note: "文字列",
        },
        Case {
            src: "\"n=${1 + 1}\"",
            expected: "string",
            note: "埋め込み付き文字列",
        },
        Case {
            src: "{let x = 10; x}",
            expected: "int",
            note: "let",
        },
        Case {
            src: "(1, 2)",
            expected: "(int, int)",
            note: "タプル",
        },
        Case {
            src: "{let (a, b) = (2, 3); a}",
            expected: "int",
            note: "タプルパターンの let",
        },
        Case {
            src: "(x) => {let (a, b) = x; a}",
            expected: "((a, b)) => a",
            note: "引数をタプルとして分解",
        },
        Case {
            src: "{let id = (x) => x; (id(2), id(true))}",
            expected: "(int, bool)",
            note: "let 多相",
        },
        Case {
            src: "{let id = (x) => x; id}",
            expected: "(a) => a",
            note: "一般化された関数",
        },
        Case {
            src: "{let a = 2; let a = true; a}",
            expected: "bool",
            note: "後の束縛が隠す",
        },
        Case {
            src: "(x) => {let (a, _) = x; a(2)}",
            expected: "(((int) => a, b)) => a",
            note: "分解した関数の呼び出し",
        },
        Case {
            src: "(arr) => arr.length",
            expected: "(Array(a)) => int",
            note: "属性",
        },
        Case {
            src: "(arr) => {return arr.length}",
            expected: "(Array(a)) => int",
            note: "return",
        },
        Case {
            src: "(arr) => {let x = arr[arr.length - 1]; return arr}",
            expected: "(Array(a)) => Array(a)",
            note: "添字",
        },
        Case {
            src: "{let ok = []; ok.push(1); ok}",
            expected: "Array(int)",
            note: "push で要素型が決まる",
        },
        Case {
            src: "[1,2]",
            expected: "Array(int)",
            note: "配列リテラル",
        },
        Case {
            src: "(a) => {if (true) {return [a]} else {return [1]}}",
            expected: "(int) => Array(int)",
            note: "分岐ごとの return",
        },
        Case {
            src: "(arr) => {
                if (arr.length <= 1) {
                    return 10;
                }
                return 5;
            }",
            expected: "(Array(a)) => int",
            note: "else のない if と後続の return",
        },
        Case {
            src: "{
                let quicksort = (arr) => {
                    if (arr.length <= 1) {
                        return arr;
                    }
                    let pivot = arr[arr.length - 1];
                    let leftArr = [];
                    let rightArr = [];
                    return [1,2];
                };
                quicksort
            }",
            expected: "(Array(int)) => Array(int)",
            note: "複数行のブロック",
        },
        Case {
            src: "(x) => switch (x) {: 1: true; _: false :}",
            expected: "(int) => bool",
            note: "switch",
        },
        Case {
            src: "(p) => switch (p) {: (a, b): a :}",
            expected: "((a, b)) => a",
            note: "switch のタプルパターン",
        },
        Case {
            src: "{let arr = []; for (let i = 0; i < 10; i += 1) {arr.push(i)}; arr}",
            expected: "Array(int)",
            note: "for の束縛は条件・更新・本体から見える",
        },
        Case {
            src: "(y) => {let f = (x) => y; f}",
            expected: "(a) => (b) => a",
            note: "環境に自由な変数は量化しない",
        },
        Case {
            src: "let a = 1\na",
            expected: "int",
            note: "複数ルートはブロックとして推論",
        },
    ];
    for case in cases {
        assert_eq!(
            infer_display(case.src),
            case.expected,
            "{}: {}",
            case.note,
            case.src
        );
    }
}

#[test]
/// else のない if は void と突き合わされる。
fn missing_else_conflicts_with_return() {
    assert_eq!(
        infer_error("(a) => {if (a) {return 1}}"),
        TypeError::IncompatibleTypes(t_void(), t_int())
    );
}

#[test]
/// 型エラーの種類をテーブルで検証する。
fn inference_errors() {
    struct Case<'a> {
        src: &'a str,
        expected: TypeError,
        note: &'a str,
    }
    let cases = [
        Case {
            src: "x",
            expected: TypeError::UnboundVariable("x".into()),
            note: "未束縛変数",
        },
        Case {
            src: "1 + true",
            expected: TypeError::IncompatibleTypes(t_int(), t_bool()),
            note: "演算子の引数",
        },
        Case {
            src: "if (1) {2} else {3}",
            expected: TypeError::IncompatibleTypes(t_int(), t_bool()),
            note: "条件は bool",
        },
        Case {
            src: "return 1",
            expected: TypeError::ReturnOutsideFunction,
            note: "関数外の return",
        },
        Case {
            src: "() => 1",
            expected: TypeError::EmptyLambda,
            note: "引数のないラムダ",
        },
        Case {
            src: "f()",
            expected: TypeError::EmptyCall,
            note: "引数のない呼び出し",
        },
        Case {
            src: "switch (1) {: Foo(x): 1 :}",
            expected: TypeError::UnknownConstructor("Foo".into()),
            note: "未知のコンストラクタ",
        },
        Case {
            src: "{let f = (x) => x; f(1, 2)}",
            expected: TypeError::ArityMismatch {
                expected: 1,
                found: 2,
            },
            note: "引数の数",
        },
        Case {
            src: "(f) => (f(1), f(true))",
            expected: TypeError::IncompatibleTypes(t_int(), t_bool()),
            note: "ラムダ引数は単相",
        },
        Case {
            src: "{for (let i = 0; i < 3; i += 1) {i}; i}",
            expected: TypeError::UnboundVariable("i".into()),
            note: "for の束縛はループの外から見えない",
        },
    ];
    for case in cases {
        assert_eq!(
            infer_error(case.src),
            case.expected,
            "{}: {}",
            case.note,
            case.src
        );
    }
}

#[test]
/// 自己適用は出現検査で失敗する。
fn self_application_fails_occurs_check() {
    assert!(matches!(
        infer_error("(x) => x(x)"),
        TypeError::OccursCheck(..)
    ));
}
