// パス: src/builtins.rs
// 役割: 推論の起点となる組み込み型環境（変数・演算子・コンストラクタ・型宣言）を定義する
// 意図: 組み込みの一覧を表として一元管理し、環境は一度だけ構築して複製で配る
// 関連ファイル: src/typesys.rs, src/infer/mod.rs, src/pipeline.rs
//! 組み込み定義モジュール
//!
//! - 名前と分類を `BUILTINS` 表で列挙し、分類ごとにスキームを割り当てる。
//! - 配列は `Array(k)`、2 要素タプルは `,(a, b)` で表す。

use once_cell::sync::Lazy;

use crate::typesys::{
    t_array, t_bool, t_int, t_null, t_pair, t_void, Constructor, Scheme, Tenv, Type, TypeDef,
};

/// 組み込みの分類。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinKind {
    /// 具象型の定数（`null`, `true` など）
    Constant(&'static str),
    /// `(int, int) => int`
    IntArith,
    /// `(int, int) => bool`
    IntCompare,
    /// `∀k. (k, k) => int`
    Assign,
    ArrayLength,
    ArrayIndex,
    ArrayPush,
    ArrayConcat,
    ArrayEmpty,
    ArrayCons,
    Pair,
}

/// 組み込み定義。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuiltinDef {
    pub name: &'static str,
    pub kind: BuiltinKind,
}

/// 組み込みで提供する名前の一覧。
pub const BUILTINS: &[BuiltinDef] = &[
    BuiltinDef {
        name: "null",
        kind: BuiltinKind::Constant("null"),
    },
    BuiltinDef {
        name: "true",
        kind: BuiltinKind::Constant("bool"),
    },
    BuiltinDef {
        name: "false",
        kind: BuiltinKind::Constant("bool"),
    },
    BuiltinDef {
        name: "void",
        kind: BuiltinKind::Constant("void"),
    },
    BuiltinDef {
        name: "length",
        kind: BuiltinKind::ArrayLength,
    },
    BuiltinDef {
        name: "index",
        kind: BuiltinKind::ArrayIndex,
    },
    BuiltinDef {
        name: "push",
        kind: BuiltinKind::ArrayPush,
    },
    BuiltinDef {
        name: "concat",
        kind: BuiltinKind::ArrayConcat,
    },
    BuiltinDef {
        name: "[]",
        kind: BuiltinKind::ArrayEmpty,
    },
    BuiltinDef {
        name: "::",
        kind: BuiltinKind::ArrayCons,
    },
    BuiltinDef {
        name: "+",
        kind: BuiltinKind::IntArith,
    },
    BuiltinDef {
        name: "+=",
        kind: BuiltinKind::IntArith,
    },
    BuiltinDef {
        name: "-",
        kind: BuiltinKind::IntArith,
    },
    BuiltinDef {
        name: "-=",
        kind: BuiltinKind::IntArith,
    },
    BuiltinDef {
        name: ">",
        kind: BuiltinKind::IntCompare,
    },
    BuiltinDef {
        name: "<",
        kind: BuiltinKind::IntCompare,
    },
    BuiltinDef {
        name: "<=",
        kind: BuiltinKind::IntCompare,
    },
    BuiltinDef {
        name: "=",
        kind: BuiltinKind::Assign,
    },
    BuiltinDef {
        name: ",",
        kind: BuiltinKind::Pair,
    },
];

impl BuiltinKind {
    /// 分類に対応する型スキーム。
    pub fn scheme(self) -> Scheme {
        let k = || Type::var("k");
        match self {
            BuiltinKind::Constant(name) => Scheme::mono(Type::con(name)),
            BuiltinKind::IntArith => Scheme::mono(Type::func(vec![t_int(), t_int()], t_int())),
            BuiltinKind::IntCompare => Scheme::mono(Type::func(vec![t_int(), t_int()], t_bool())),
            BuiltinKind::Assign => Scheme::poly(&["k"], Type::func(vec![k(), k()], t_int())),
            BuiltinKind::ArrayLength => {
                Scheme::poly(&["k"], Type::func(vec![t_array(k())], t_int()))
            }
            BuiltinKind::ArrayIndex => {
                Scheme::poly(&["k"], Type::func(vec![t_array(k()), t_int()], k()))
            }
            BuiltinKind::ArrayPush => {
                Scheme::poly(&["k"], Type::func(vec![t_array(k()), k()], t_void()))
            }
            BuiltinKind::ArrayConcat => Scheme::poly(
                &["k"],
                Type::func(vec![t_array(k()), t_array(k())], t_array(k())),
            ),
            BuiltinKind::ArrayEmpty => Scheme::poly(&["k"], t_array(k())),
            BuiltinKind::ArrayCons => {
                Scheme::poly(&["k"], Type::func(vec![k(), t_array(k())], t_array(k())))
            }
            BuiltinKind::Pair => Scheme::poly(
                &["a", "b"],
                Type::func(
                    vec![Type::var("a"), Type::var("b")],
                    t_pair(Type::var("a"), Type::var("b")),
                ),
            ),
        }
    }
}

fn build_env() -> Tenv {
    let mut env = Tenv::new();
    for def in BUILTINS {
        env.scope.insert(def.name.to_string(), def.kind.scheme());
    }
    env.constructors.insert(
        ",".into(),
        Constructor {
            free: vec!["a".into(), "b".into()],
            args: vec![Type::var("a"), Type::var("b")],
            result: t_pair(Type::var("a"), Type::var("b")),
        },
    );
    env.constructors.insert(
        "null".into(),
        Constructor {
            free: Vec::new(),
            args: Vec::new(),
            result: t_null(),
        },
    );
    env.types.insert(
        "Array".into(),
        TypeDef {
            free: 1,
            constructors: Vec::new(),
        },
    );
    env.types.insert(
        ",".into(),
        TypeDef {
            free: 2,
            constructors: vec![",".into()],
        },
    );
    env.types.insert(
        "null".into(),
        TypeDef {
            free: 0,
            constructors: vec!["null".into()],
        },
    );
    env
}

static BUILTIN_ENV: Lazy<Tenv> = Lazy::new(build_env);

/// 組み込み型環境の複製を返す。
pub fn builtin_env() -> Tenv {
    BUILTIN_ENV.clone()
}
