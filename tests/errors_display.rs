// パス: tests/errors_display.rs
// 役割: ErrorInfo の表示分岐と、各段階のエラーから作る表示情報を検証する
// 意図: 診断文字列（コード・行列・スニペット）の退行を防ぐ
// 関連ファイル: src/errors.rs, src/pipeline.rs
#[path = "test_support.rs"]
mod support;

use algw::errors::{ErrorInfo, TypeError};
use algw::typesys::{t_int, t_void};
use support::infer_failure;

#[test]
/// 行・列・位置とスニペットがそろった場合。
fn error_display_line_col_pos_and_snippet() {
    let e = ErrorInfo::at("E001", "msg", Some(12), Some(3), Some(5)).with_snippet("abcdef");
    assert_eq!(e.to_string(), "[E001] msg @line=3,col=5 @pos=12\nabcdef\n    ^");
}

#[test]
fn error_display_line_col_only() {
    let e = ErrorInfo::at("E002", "msg", None, Some(2), Some(1));
    assert_eq!(e.to_string(), "[E002] msg @line=2,col=1");
}

#[test]
fn error_display_pos_only() {
    let e = ErrorInfo::new("E003", "msg", Some(7));
    assert_eq!(e.to_string(), "[E003] msg @pos=7");
}

#[test]
fn error_display_plain() {
    let e = ErrorInfo::new("E004", "plain", None);
    assert_eq!(e.to_string(), "[E004] plain");
}

#[test]
/// 型エラーのコードは安定している。
fn type_error_codes() {
    let cases = [
        (TypeError::IncompatibleTypes(t_int(), t_void()), "TYPE001"),
        (TypeError::OccursCheck("a".into(), t_int()), "TYPE002"),
        (
            TypeError::ArityMismatch {
                expected: 1,
                found: 2,
            },
            "TYPE003",
        ),
        (TypeError::UnboundVariable("x".into()), "TYPE010"),
        (TypeError::UnknownConstructor("Foo".into()), "TYPE011"),
        (TypeError::EmptyLambda, "TYPE020"),
        (TypeError::EmptyCall, "TYPE021"),
        (TypeError::ReturnOutsideFunction, "TYPE030"),
        (TypeError::SubstitutionOverwrite("a".into()), "TYPE090"),
    ];
    for (err, code) in cases {
        assert_eq!(err.code(), code, "{err}");
        assert_eq!(err.info().code, code);
    }
}

#[test]
/// 字句エラーは位置から行・列とスニペットを得る。
fn lex_error_info() {
    let src = "(1, 2";
    let info = infer_failure(src).info(src);
    assert_eq!(info.code, "LEX002");
    assert_eq!((info.line, info.col), (Some(1), Some(1)));
    assert_eq!(
        info.to_string(),
        "[LEX002] round リストが閉じられていません @line=1,col=1 @pos=0\n(1, 2\n^"
    );
}

#[test]
/// 構文エラーは未消費ノードの位置を指す。
fn parse_error_info() {
    let src = "a b";
    let info = infer_failure(src).info(src);
    assert_eq!(info.code, "PAR002");
    assert_eq!(info.pos, Some(2));
    assert_eq!((info.line, info.col), (Some(1), Some(3)));
    assert_eq!(info.snippet.as_deref(), Some("a b"));

    let info = infer_failure("").info("");
    assert_eq!(info.to_string(), "[PAR000] 入力が空です");
}

#[test]
/// 入れ子の上限超過は最も深いノードの位置を指す。
fn too_deep_error_info() {
    let src = format!("{}1{}", "(".repeat(30), ")".repeat(30));
    let info = infer_failure(&src).info(&src);
    assert_eq!(info.code, "PAR003");
    assert_eq!(info.pos, Some(30));
    assert!(info.msg.contains("上限 20 段"), "{}", info.msg);
}

#[test]
/// 空の埋め込みは `${` の位置の字句エラー。
fn empty_embed_error_info() {
    let src = "\"${}\"";
    let info = infer_failure(src).info(src);
    assert_eq!(info.code, "LEX004");
    assert_eq!(info.pos, Some(1));
}

#[test]
/// 型エラーは位置を持たない。
fn type_error_info() {
    let src = "(a) => {if (a) {return 1}}";
    let info = infer_failure(src).info(src);
    assert_eq!(info.to_string(), "[TYPE001] 型不一致: void vs int");
}
