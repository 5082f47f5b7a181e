// パス: src/lib.rs
// 役割: クレートルート。各モジュールを配線し、よく使う API を再エクスポートする
// 意図: 字句解析から型推論とトレース取得までを外部から一通り呼べるようにする
// 関連ファイル: src/pipeline.rs, src/infer/mod.rs, src/parser/mod.rs, src/lexer.rs
//! algw ルートモジュール
//!
//! 目的:
//! - 小さな JS 風言語に対する Algorithm W（let 多相つき）の型推論器を提供する。
//! - 推論の導出を 1 ステップずつ再構成できるイベントトレースを記録する。
//!
//! 方針:
//! - コメント/ドキュメントは日本語、識別子は英語。
//! - 推論状態は `InferCtx` として明示的に受け渡し、大域状態を持たない。
//! - ロガーはライブラリ側では設定しない（`log` のレコードを出すだけ）。

pub mod ast;
pub mod builtins;
pub mod cst;
pub mod dsl;
pub mod errors;
pub mod events;
pub mod infer;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod typesys;

pub use crate::errors::{ErrorInfo, LexError, ParseError, TypeError};
pub use crate::infer::{infer_top, InferCtx, InferFailure, StmtResult};
pub use crate::lexer::{lex, LexConfig};
pub use crate::pipeline::{infer_source, Inference, PipelineError};
