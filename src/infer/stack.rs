// パス: src/infer/stack.rs
// 役割: 推論の説明スタック（push / replace / pop / break）を操作する
// 意図: 外部のステッパーがイベントだけで説明の段階表示を再現できるようにする
// 関連ファイル: src/infer/mod.rs, src/events.rs

use super::InferCtx;
use crate::ast::Src;
use crate::events::{Event, StackText};

impl InferCtx {
    /// 現在積まれている説明。
    pub fn stack(&self) -> &[Vec<StackText>] {
        &self.stack
    }

    pub(crate) fn stack_push(&mut self, src: Src, value: Vec<StackText>) {
        self.stack.push(value.clone());
        self.events.push(Event::StackPush { src, value });
    }

    /// 先頭の段を置き換える（pop と push の組として記録する）。
    pub(crate) fn stack_replace(&mut self, src: Src, value: Vec<StackText>) {
        self.stack_pop();
        self.stack_push(src, value);
    }

    pub(crate) fn stack_pop(&mut self) {
        self.stack.pop();
        self.events.push(Event::StackPop);
    }

    pub(crate) fn stack_break(&mut self, title: impl Into<String>) {
        self.events.push(Event::StackBreak {
            title: title.into(),
        });
    }
}
