// パス: tests/unify.rs
// 役割: 単一化（純粋な unify_types と、イベントを残す InferCtx::unify）を検証する
// 意図: 差分の形・失敗の種類・イベントの発行回数を固定する
// 関連ファイル: src/typesys.rs, src/infer/mod.rs, src/events.rs
use algw::ast::Src;
use algw::cst::Loc;
use algw::errors::TypeError;
use algw::events::{Event, TvarMeta};
use algw::typesys::{t_array, t_bool, t_int, t_pair, unify_types, Scheme, Subst, Type};
use algw::InferCtx;

fn v(name: &str) -> Type {
    Type::var(name)
}

fn src() -> Src {
    Src::at(Loc(0))
}

#[test]
/// unify_types の結果をテーブルで検証する。
fn unify_types_cases() {
    struct Case<'a> {
        one: Type,
        two: Type,
        expected: Result<Subst, TypeError>,
        note: &'a str,
    }
    let cases = [
        Case {
            one: v("a"),
            two: t_int(),
            expected: Ok(Subst::from([("a".to_string(), t_int())])),
            note: "変数と具象型",
        },
        Case {
            one: t_int(),
            two: v("a"),
            expected: Ok(Subst::from([("a".to_string(), t_int())])),
            note: "右辺の変数",
        },
        Case {
            one: v("a"),
            two: v("a"),
            expected: Ok(Subst::new()),
            note: "同じ変数",
        },
        Case {
            one: t_int(),
            two: t_int(),
            expected: Ok(Subst::new()),
            note: "同じ型",
        },
        Case {
            one: t_int(),
            two: t_bool(),
            expected: Err(TypeError::IncompatibleTypes(t_int(), t_bool())),
            note: "異なる具象型",
        },
        Case {
            one: Type::func(vec![v("a")], v("a")),
            two: Type::func(vec![t_int()], t_bool()),
            expected: Err(TypeError::IncompatibleTypes(t_bool(), t_int())),
            note: "結果型を先に単一化する",
        },
        Case {
            one: Type::func(vec![t_int()], t_int()),
            two: Type::func(vec![t_int(), t_int()], t_int()),
            expected: Err(TypeError::ArityMismatch {
                expected: 1,
                found: 2,
            }),
            note: "引数の数",
        },
        Case {
            one: v("a"),
            two: t_array(v("a")),
            expected: Err(TypeError::OccursCheck("a".into(), t_array(v("a")))),
            note: "出現検査",
        },
        Case {
            one: t_pair(v("a"), v("b")),
            two: t_pair(t_int(), v("a")),
            expected: Ok(Subst::from([
                ("a".to_string(), t_int()),
                ("b".to_string(), t_int()),
            ])),
            note: "前の引数の結果を後の引数へ適用する",
        },
        Case {
            one: Type::func(vec![t_int()], t_int()),
            two: t_int(),
            expected: Err(TypeError::IncompatibleTypes(
                Type::func(vec![t_int()], t_int()),
                t_int(),
            )),
            note: "関数と具象型",
        },
    ];
    for case in cases {
        assert_eq!(
            unify_types(&case.one, &case.two),
            case.expected,
            "{}",
            case.note
        );
    }
}

#[test]
/// 差分が空でない単一化は前後 2 回のイベントを残す。
fn unify_emits_before_and_after() {
    let mut ctx = InferCtx::new();
    let a = ctx.new_type_var(TvarMeta::Free { prev: "k".into() });
    ctx.unify(&a, &t_int(), src(), "left", "right")
        .expect("unify");
    let unifies: Vec<&Event> = ctx
        .events()
        .iter()
        .filter(|e| matches!(e, Event::Unify { .. }))
        .collect();
    assert_eq!(unifies.len(), 2);
    match unifies[1] {
        Event::Unify {
            one,
            two,
            one_name,
            ..
        } => {
            assert_eq!(one, &t_int());
            assert_eq!(two, &t_int());
            assert_eq!(one_name, "left");
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(ctx.subst()["a"], t_int());

    ctx.unify(&a, &t_int(), src(), "left", "right")
        .expect("unify");
    let count = ctx
        .events()
        .iter()
        .filter(|e| matches!(e, Event::Unify { .. }))
        .count();
    assert_eq!(count, 3, "空の差分は 1 回だけ");
}

#[test]
/// 失敗した単一化は置換とイベントを変えない。
fn failed_unify_leaves_state() {
    let mut ctx = InferCtx::new();
    let before = ctx.events().len();
    let err = ctx
        .unify(&t_int(), &t_bool(), src(), "left", "right")
        .expect_err("mismatch");
    assert_eq!(err, TypeError::IncompatibleTypes(t_int(), t_bool()));
    assert_eq!(ctx.events().len(), before);
    assert!(ctx.subst().is_empty());
}

#[test]
/// インスタンス化は量化変数ごとに新しい変数を作る。
fn instantiate_records_free_meta() {
    let mut ctx = InferCtx::new();
    let scheme = Scheme::poly(&["k"], Type::func(vec![v("k")], v("k")));
    let t = ctx.instantiate(&scheme);
    assert_eq!(t, Type::func(vec![v("a")], v("a")));
    assert_eq!(
        ctx.tvar_meta().get("a"),
        Some(&TvarMeta::Free { prev: "k".into() })
    );
    assert!(matches!(ctx.events(), [Event::NewVar { name }] if name == "a"));

    let mono = ctx.instantiate(&Scheme::mono(t_int()));
    assert_eq!(mono, t_int());
    assert_eq!(ctx.events().len(), 1);
}
