//! 条件分发：select

use async_trait::async_trait;
use serde_json::Value;

use super::{RouteWorker, WorkerContext};
use crate::router::channel::Channel;
use crate::router::spec::{RouteKind, Selector};
use crate::utils::Result;

/// 按选择键分发
///
/// 值发往所有选择值等于 `selector(value)` 的输出，可能零个、一个或多个，没有默认分支。
pub struct SelectWorker {
    /// 输入通道
    pub input: Channel,
    /// (输出通道, 选择值)
    pub outputs: Vec<(Channel, Value)>,
    /// 选择函数
    pub selector: Selector,
}

#[async_trait]
impl RouteWorker for SelectWorker {
    fn kind(&self) -> RouteKind {
        RouteKind::Select
    }

    async fn run(self: Box<Self>, ctx: &WorkerContext) -> Result<()> {
        while let Some(value) = ctx.recv(&self.input).await {
            let key = (self.selector)(&value).map_err(|e| ctx.callback_failed(e))?;
            for (output, selector_value) in &self.outputs {
                if *selector_value == key {
                    ctx.emit(output, value.clone()).await;
                }
            }
        }
        let outputs: Vec<Channel> = self.outputs.iter().map(|(ch, _)| ch.clone()).collect();
        ctx.close_outputs(&outputs);
        Ok(())
    }
}
