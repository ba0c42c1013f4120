//! 终端族：sink / collect

use async_trait::async_trait;
use serde_json::Value;

use super::{RouteWorker, WorkerContext};
use crate::router::channel::Channel;
use crate::router::spec::{Reducer, RouteKind, SinkFn};
use crate::utils::Result;

/// 终端消费：对每个值调用回调，没有输出
pub struct SinkWorker {
    /// 输入通道
    pub input: Channel,
    /// 消费回调
    pub sink: SinkFn,
}

#[async_trait]
impl RouteWorker for SinkWorker {
    fn kind(&self) -> RouteKind {
        RouteKind::Sink
    }

    async fn run(self: Box<Self>, ctx: &WorkerContext) -> Result<()> {
        while let Some(value) = ctx.recv(&self.input).await {
            (self.sink)(value).map_err(|e| ctx.callback_failed(e))?;
        }
        ctx.close_outputs(&[]);
        Ok(())
    }
}

/// 归约：输入关闭后发出最终累加值一次，再关闭输出
pub struct CollectWorker {
    /// 输入通道
    pub input: Channel,
    /// 输出通道
    pub output: Channel,
    /// 归约函数
    pub reducer: Reducer,
    /// 累加器初始值
    pub initial: Value,
}

#[async_trait]
impl RouteWorker for CollectWorker {
    fn kind(&self) -> RouteKind {
        RouteKind::Collect
    }

    async fn run(self: Box<Self>, ctx: &WorkerContext) -> Result<()> {
        let CollectWorker {
            input,
            output,
            reducer,
            initial,
        } = *self;

        let mut acc = initial;
        while let Some(value) = ctx.recv(&input).await {
            acc = reducer(acc, value).map_err(|e| ctx.callback_failed(e))?;
        }
        ctx.emit(&output, acc).await;
        ctx.close_outputs(std::slice::from_ref(&output));
        Ok(())
    }
}
