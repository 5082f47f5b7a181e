// パス: tests/typesys_algebra.rs
// 役割: 型・置換・スキームの純粋な操作（自由変数・適用・合成・一般化・表示）を検証する
// 意図: 推論器を介さずに代数的な性質を固定し、推論側の不具合と切り分けられるようにする
// 関連ファイル: src/typesys.rs
use algw::errors::TypeError;
use algw::typesys::{
    compose_subst, generalize, make_name, normalize_vars, scheme_apply, scheme_free, t_array,
    t_bool, t_int, t_pair, tenv_free, type_apply, type_free, Scheme, Subst, Tenv, Type,
};

fn v(name: &str) -> Type {
    Type::var(name)
}

#[test]
/// 連番から作る型変数名。
fn make_name_sequence() {
    let cases = [(0, "a"), (1, "b"), (25, "z"), (26, "ba"), (27, "bb"), (52, "ca")];
    for (n, expected) in cases {
        assert_eq!(make_name(n), expected, "n={n}");
    }
}

#[test]
/// 自由変数は出現順で、関数は結果型が先。
fn free_variable_order() {
    let f = Type::func(vec![v("a"), v("b")], v("c"));
    assert_eq!(type_free(&f), vec!["c", "a", "b"]);
    let nested = t_array(t_pair(v("x"), v("x")));
    assert_eq!(type_free(&nested), vec!["x"]);
    assert!(type_free(&t_int()).is_empty());

    let scheme = Scheme::poly(&["a"], Type::func(vec![v("a")], v("b")));
    assert_eq!(scheme_free(&scheme), vec!["b"]);
}

#[test]
/// 置換の適用は構造を保ったまま変数だけを置き換える。
fn apply_replaces_vars() {
    let s = Subst::from([("a".to_string(), t_int())]);
    let t = Type::func(vec![v("a"), t_array(v("a"))], v("b"));
    assert_eq!(
        type_apply(&s, &t),
        Type::func(vec![t_int(), t_array(t_int())], v("b"))
    );
}

#[test]
/// 合成は古い置換の値域へ新しい置換を適用する。
fn compose_applies_new_to_old() {
    let old = Subst::from([("a".to_string(), Type::func(vec![v("b")], v("b")))]);
    let new = Subst::from([("b".to_string(), t_int())]);
    let composed = compose_subst(&new, &old).expect("compose");
    assert_eq!(composed["a"], Type::func(vec![t_int()], t_int()));
    assert_eq!(composed["b"], t_int());
}

#[test]
/// 定義済みの名前を上書きする合成は失敗する。
fn compose_rejects_overwrite() {
    let old = Subst::from([("a".to_string(), t_bool())]);
    let new = Subst::from([("a".to_string(), t_int())]);
    assert_eq!(
        compose_subst(&new, &old),
        Err(TypeError::SubstitutionOverwrite("a".into()))
    );
}

#[test]
/// 環境に自由出現する変数は量化しない。
fn generalize_skips_env_vars() {
    let mut tenv = Tenv::new();
    tenv.scope.insert("x".into(), Scheme::mono(v("a")));
    assert_eq!(tenv_free(&tenv), vec!["a"]);
    let scheme = generalize(&tenv, &Type::func(vec![v("a")], v("b")));
    assert_eq!(scheme.vars, vec!["b"]);

    let closed = generalize(&Tenv::new(), &Type::func(vec![v("a")], v("a")));
    assert_eq!(closed.to_string(), "forall a. (a) => a");
}

#[test]
/// 量化変数は置換の対象から外れる。
fn scheme_apply_respects_bound_vars() {
    let scheme = Scheme::poly(&["a"], Type::func(vec![v("a")], v("b")));
    let s = Subst::from([("a".to_string(), t_int()), ("b".to_string(), t_bool())]);
    let applied = scheme_apply(&s, &scheme);
    assert_eq!(applied.body, Type::func(vec![v("a")], t_bool()));
    assert_eq!(applied.vars, vec!["a"]);
}

#[test]
/// 型とスキームの表示形式。
fn display_forms() {
    struct Case<'a> {
        ty: Type,
        expected: &'a str,
    }
    let cases = [
        Case {
            ty: t_pair(t_int(), t_bool()),
            expected: "(int, bool)",
        },
        Case {
            ty: Type::func(vec![t_array(v("a"))], t_int()),
            expected: "(Array(a)) => int",
        },
        Case {
            ty: Type::func(vec![Type::func(vec![t_int()], v("a")), v("b")], v("a")),
            expected: "((int) => a, b) => a",
        },
    ];
    for case in cases {
        assert_eq!(case.ty.to_string(), case.expected);
    }
    assert_eq!(Scheme::mono(t_int()).to_string(), "int");
}

#[test]
/// 表示順に a, b, ... へ振り直す。
fn normalize_renames_in_display_order() {
    let t = Type::func(vec![v("q"), t_array(v("z"))], v("q"));
    let normalized = normalize_vars(&t);
    assert_eq!(normalized.to_string(), "(a, Array(b)) => a");
    assert_eq!(normalize_vars(&normalized), normalized);
}
