// パス: tests/trace_events.rs
// 役割: 推論が残すイベント列（ステップ数・説明スタック・型変数の由来・再生）を検証する
// 意図: 可視化器が依存するイベントの形と順序を固定する
// 関連ファイル: src/events.rs, src/infer/mod.rs, src/infer/stack.rs
#[path = "test_support.rs"]
mod support;

use algw::events::{replay_infer_types, step_count, Event, TvarMeta};
use algw::typesys::{t_int, type_apply};
use support::{infer_ctx, infer_failure, infer_trace};

const PROGRAMS: &[&str] = &[
    "10",
    "{let x = 10; x}",
    "{let id = (x) => x; (id(2), id(true))}",
    "(x) => {let (a, _) = x; a(2)}",
    "{let ok = []; ok.push(1); ok}",
    "(a) => {if (true) {return [a]} else {return [1]}}",
    "(x) => switch (x) {: 1: true; _: false :}",
    "{let arr = []; for (let i = 0; i < 10; i += 1) {arr.push(i)}; arr}",
];

#[test]
/// break と差分のある unify の数がステップ数になる。
fn step_count_of_let_block() {
    let trace = infer_trace("{let x = 10; x}");
    assert_eq!(step_count(&trace.events), 7);
}

#[test]
/// リテラル 1 つはスコープと推論結果だけを残す。
fn literal_emits_scope_and_infer() {
    let trace = infer_trace("10");
    let kinds: Vec<&str> = trace.events.iter().map(Event::kind).collect();
    assert_eq!(kinds, vec!["scope", "infer"]);
    assert!(matches!(&trace.events[1], Event::Infer { value, .. } if *value == t_int()));
}

#[test]
/// let 文の説明は決まった順で区切られる。
fn let_break_titles() {
    let trace = infer_trace("{let x = 10; x}");
    let titles: Vec<&str> = trace
        .events
        .iter()
        .filter_map(|e| match e {
            Event::StackBreak { title } => Some(title.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        titles,
        vec![
            "'let' statement",
            "pattern name",
            "new type variable",
            "pattern type",
            "unify pattern and value",
        ]
    );
}

#[test]
/// 差分のある unify は適用前と適用後の 2 回記録される。
fn unify_pair_shows_before_and_after() {
    let trace = infer_trace("{let x = 10; x}");
    let unifies: Vec<(String, String)> = trace
        .events
        .iter()
        .filter_map(|e| match e {
            Event::Unify { one, two, .. } => Some((one.to_string(), two.to_string())),
            _ => None,
        })
        .collect();
    assert_eq!(
        unifies,
        vec![
            ("a".to_string(), "int".to_string()),
            ("int".to_string(), "int".to_string()),
        ]
    );
}

#[test]
/// パターン変数の由来が記録される。
fn pattern_var_meta() {
    let trace = infer_trace("{let x = 10; x}");
    assert!(matches!(
        trace.tvar_meta.get("a"),
        Some(TvarMeta::PatVar { name, .. }) if name == "x"
    ));
    let trace = infer_trace("(arr) => arr.length");
    assert!(matches!(
        trace.tvar_meta.get("a"),
        Some(TvarMeta::LambdaReturn { .. })
    ));
    assert!(trace
        .tvar_meta
        .values()
        .any(|m| matches!(m, TvarMeta::ApplyResult { .. })));
    assert!(trace
        .tvar_meta
        .values()
        .any(|m| matches!(m, TvarMeta::Free { prev } if prev == "k")));
}

#[test]
/// let で束縛した名前が見えるスコープが記録される。
fn scope_event_contains_binding() {
    let trace = infer_trace("{let x = 10; x}");
    assert!(trace
        .events
        .iter()
        .any(|e| matches!(e, Event::Scope { scope } if scope.contains_key("x"))));
}

#[test]
/// 推論が成功すれば説明スタックは空に戻る。
fn stack_is_balanced() {
    for src in PROGRAMS {
        let ctx = infer_ctx(src);
        assert!(ctx.stack().is_empty(), "{src}");
        let pushes = ctx
            .events()
            .iter()
            .filter(|e| matches!(e, Event::StackPush { .. }))
            .count();
        let pops = ctx
            .events()
            .iter()
            .filter(|e| matches!(e, Event::StackPop))
            .count();
        assert_eq!(pushes, pops, "{src}");
    }
}

#[test]
/// 差分を順に適用した結果は最終置換の適用と一致する。
fn replay_matches_final_subst() {
    for src in PROGRAMS {
        let trace = infer_trace(src);
        let replayed = replay_infer_types(&trace.events);
        let direct: Vec<_> = trace
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Infer { src, value } => Some((*src, type_apply(&trace.subst, value))),
                _ => None,
            })
            .collect();
        assert_eq!(replayed, direct, "{src}");
    }
}

#[test]
/// 可視化器向けの JSON のキー名。
fn trace_json_keys() {
    let trace = infer_trace("{let x = 10; x}");
    let json = serde_json::to_value(&trace).expect("json");
    assert_eq!(json["tvarMeta"]["a"]["type"], "pat-var");
    assert_eq!(json["tvarMeta"]["a"]["name"], "x");
    let events = json["events"].as_array().expect("events");
    assert_eq!(events[0]["type"], "scope");
    assert!(events.iter().any(|e| e["type"] == "new-var"));
    let unify = events
        .iter()
        .find(|e| e["type"] == "unify")
        .expect("unify event");
    assert_eq!(unify["oneName"], "pattern");
    assert_eq!(unify["twoName"], "value");
    assert!(unify.get("message").is_none());
}

#[test]
/// 失敗時もそこまでのトレースが返る。
fn failure_keeps_partial_trace() {
    let err = infer_failure("(a) => {if (a) {return 1}}");
    let trace = err.trace().expect("type error carries a trace");
    assert!(!trace.events.is_empty());
    assert!(step_count(&trace.events) > 0);
    assert!(trace
        .tvar_meta
        .values()
        .any(|m| matches!(m, TvarMeta::ReturnAny { .. })));

    assert!(infer_failure("(1, 2").trace().is_none());
}
