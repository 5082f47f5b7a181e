// パス: src/pipeline.rs
// 役割: 字句解析 → 構文照合 → 型推論を 1 回の呼び出しにまとめる
// 意図: CLI とテストで同じ経路を通し、失敗時も部分トレースと位置情報を返す
// 関連ファイル: src/lexer.rs, src/parser/mod.rs, src/infer/mod.rs, src/bin/algw_trace.rs

use thiserror::Error;

use crate::ast::{Expr, Src, Stmt};
use crate::builtins::builtin_env;
use crate::cst::Cst;
use crate::dsl::Metadata;
use crate::errors::{ErrorInfo, LexError, ParseError, TypeError};
use crate::events::Trace;
use crate::infer::infer_top;
use crate::lexer::{lex, LexConfig, LineMap};
use crate::parser::parse;
use crate::typesys::{normalize_vars, Type};

/// 推論に成功したときの結果。
#[derive(Clone, Debug)]
pub struct Inference {
    /// 置換適用済みの型（変数名は推論時のまま）
    pub ty: Type,
    /// 型変数を表示順に振り直した表記
    pub display: String,
    pub trace: Trace,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Lex(LexError),
    /// 構文エラーと、失敗箇所のバイト位置
    #[error("{error}")]
    Parse { error: ParseError, pos: Option<usize> },
    /// 型エラーと、そこまでのトレース
    #[error("{error}")]
    Type { error: TypeError, trace: Trace },
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Lex(e) => e.code(),
            PipelineError::Parse { error, .. } => error.code(),
            PipelineError::Type { error, .. } => error.code(),
        }
    }

    /// 失敗までに記録されたトレース（型エラーのときだけ存在する）。
    pub fn trace(&self) -> Option<&Trace> {
        match self {
            PipelineError::Type { trace, .. } => Some(trace),
            _ => None,
        }
    }

    /// 行・列とスニペット付きの表示情報を作る。
    pub fn info(&self, source: &str) -> ErrorInfo {
        let pos = match self {
            PipelineError::Lex(e) => Some(e.pos()),
            PipelineError::Parse { pos, .. } => *pos,
            PipelineError::Type { .. } => None,
        };
        let msg = self.to_string();
        match pos {
            Some(pos) => {
                let map = LineMap::new(source);
                let (line, col) = map.locate(source, pos);
                ErrorInfo::at(self.code(), msg, Some(pos), Some(line), Some(col))
                    .with_snippet(map.line_text(source, line))
            }
            None => ErrorInfo::new(self.code(), msg, None),
        }
    }
}

impl From<LexError> for PipelineError {
    fn from(e: LexError) -> Self {
        PipelineError::Lex(e)
    }
}

/// ルートごとに文を解析する。複数あればブロックにまとめる。
pub fn parse_source(cst: &Cst) -> Result<(Stmt, Metadata), ParseError> {
    let mut stmts = Vec::with_capacity(cst.roots.len());
    let mut metadata = Metadata::new();
    for root in &cst.roots {
        let (stmt, meta) = parse(cst, *root).into_result()?;
        metadata.extend(meta);
        stmts.push(stmt);
    }
    match stmts.len() {
        0 => Err(ParseError::EmptyInput),
        1 => Ok((stmts.remove(0), metadata)),
        _ => {
            let src = stmts[0].src().merge(stmts[stmts.len() - 1].src());
            let block = Expr::Block { stmts, src };
            Ok((Stmt::Expr { expr: block, src }, metadata))
        }
    }
}

/// ソース文字列の型を組み込み環境のもとで推論する。
#[allow(clippy::result_large_err)]
pub fn infer_source(config: &LexConfig, source: &str) -> Result<Inference, PipelineError> {
    let cst = lex(config, source)?;
    let (stmt, metadata) = parse_source(&cst).map_err(|error| {
        let pos = error.loc().and_then(|loc| cst.span(loc)).map(|span| span.start);
        PipelineError::Parse { error, pos }
    })?;
    log::debug!("parsed: {stmt}");
    let (ty, trace) = infer_top(&builtin_env(), &stmt).map_err(|failure| {
        PipelineError::Type {
            error: failure.error,
            trace: failure.trace,
        }
    })?;
    Ok(Inference {
        display: normalize_vars(&ty).to_string(),
        ty,
        trace,
        metadata,
    })
}

/// `src` が覆うソース文字列。
pub fn source_of_src<'a>(cst: &Cst, source: &'a str, src: Src) -> Option<&'a str> {
    let start = cst.span(src.left)?.start;
    let end = cst.span(src.right.unwrap_or(src.left))?.end;
    source.get(start..end.max(start))
}
